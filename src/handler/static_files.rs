//! Static file serving module
//!
//! Resolves request paths under the static root, with index documents,
//! conditional requests and single byte ranges.

use std::fs::Metadata;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use hyper::header::{IF_MODIFIED_SINCE, IF_NONE_MATCH, RANGE};
use hyper::{Method, Request, Response};
use percent_encoding::percent_decode_str;
use tokio::fs;

use crate::config::StaticConfig;
use crate::error::StartupError;
use crate::http::response::{build_cached_response, build_partial_response, Validators};
use crate::http::{self, cache, mime, range::RangeParseResult, ResponseBody};
use crate::logger;

/// Static root handler
pub struct StaticFiles {
    /// Canonical root, `None` when the directory does not exist
    root: Option<PathBuf>,
    index: String,
    cache_control: String,
}

/// Everything a file lookup needs, copied out of the request
#[derive(Debug, Clone)]
pub struct FileRequest {
    pub path: String,
    pub query: Option<String>,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub range: Option<String>,
}

impl FileRequest {
    /// `None` for methods other than GET and HEAD, which are never served from disk
    pub fn from_request<B>(req: &Request<B>) -> Option<Self> {
        let method = req.method();
        if method != Method::GET && method != Method::HEAD {
            return None;
        }
        let header = |name: hyper::header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        Some(Self {
            path: req.uri().path().to_string(),
            query: req.uri().query().map(ToString::to_string),
            is_head: method == Method::HEAD,
            if_none_match: header(IF_NONE_MATCH),
            if_modified_since: header(IF_MODIFIED_SINCE),
            range: header(RANGE),
        })
    }
}

/// Request path after decoding and normalization
#[derive(Debug, PartialEq, Eq)]
enum SafePath {
    Relative(PathBuf),
    /// A segment starts with `.`
    Hidden,
    /// `..`, NUL, backslash or undecodable input
    Forbidden,
}

impl StaticFiles {
    pub fn new(config: &StaticConfig) -> Result<Self, StartupError> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let resolved = resolve_root(Path::new(&config.root), exe_dir.as_deref());

        let root = match std::fs::canonicalize(&resolved) {
            Ok(path) if path.is_dir() => Some(path),
            Ok(path) => {
                return Err(StartupError::StaticRoot {
                    path,
                    source: io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                logger::log_warning(&format!(
                    "Static root '{}' does not exist, only proxied paths will be served",
                    config.root
                ));
                None
            }
            Err(source) => {
                return Err(StartupError::StaticRoot {
                    path: PathBuf::from(&config.root),
                    source,
                })
            }
        };

        Ok(Self {
            root,
            index: config.index.clone(),
            cache_control: cache::cache_control(config.max_age),
        })
    }

    /// Canonical static root, if it exists
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Answer the request from disk, or `None` to pass it on
    pub async fn serve(&self, req: FileRequest) -> Option<Response<ResponseBody>> {
        let root = self.root.as_ref()?;

        let relative = match sanitize_path(&req.path) {
            SafePath::Relative(relative) => relative,
            SafePath::Hidden => return None,
            SafePath::Forbidden => {
                logger::log_warning(&format!("Path traversal attempt blocked: {}", req.path));
                return Some(http::build_404_response());
            }
        };

        let candidate = root.join(&relative);
        let meta = match lookup(&candidate).await {
            Ok(Some(meta)) => meta,
            Ok(None) => return None,
            Err(e) => return Some(read_failure(&candidate, &e)),
        };

        let (file_path, meta) = if meta.is_dir() {
            if !req.path.ends_with('/') {
                let location = match &req.query {
                    Some(q) => format!("{}/?{q}", req.path),
                    None => format!("{}/", req.path),
                };
                return Some(http::build_redirect_response(&location));
            }
            let index_path = candidate.join(&self.index);
            match lookup(&index_path).await {
                Ok(Some(meta)) if meta.is_file() => (index_path, meta),
                Ok(_) => return None,
                Err(e) => return Some(read_failure(&index_path, &e)),
            }
        } else if meta.is_file() {
            (candidate, meta)
        } else {
            return None;
        };

        // Symlinks may still point outside the root
        match fs::canonicalize(&file_path).await {
            Ok(canonical) if canonical.starts_with(root) => {}
            Ok(canonical) => {
                logger::log_warning(&format!(
                    "Path traversal attempt blocked: {} -> {}",
                    req.path,
                    canonical.display()
                ));
                return Some(http::build_404_response());
            }
            Err(e) if is_not_found(&e) => return None,
            Err(e) => return Some(read_failure(&file_path, &e)),
        }

        let content = match fs::read(&file_path).await {
            Ok(content) => content,
            Err(e) if is_not_found(&e) => return None,
            Err(e) => return Some(read_failure(&file_path, &e)),
        };

        let modified = meta.modified().unwrap_or(UNIX_EPOCH);
        Some(self.build_file_response(&req, &file_path, content, modified))
    }

    /// Build 200/206/304/416 for file content
    fn build_file_response(
        &self,
        req: &FileRequest,
        file_path: &Path,
        content: Vec<u8>,
        modified: SystemTime,
    ) -> Response<ResponseBody> {
        let total_size = content.len();
        let etag = cache::generate_etag(total_size as u64, modified);
        let last_modified = cache::format_http_date(modified);
        let validators = Validators {
            etag: &etag,
            last_modified: &last_modified,
            cache_control: &self.cache_control,
        };

        // If-None-Match takes precedence over If-Modified-Since
        let not_modified = if req.if_none_match.is_some() {
            cache::check_etag_match(req.if_none_match.as_deref(), &etag)
        } else {
            cache::not_modified_since(req.if_modified_since.as_deref(), modified)
        };
        if not_modified {
            return http::build_304_response(&etag, &last_modified, &self.cache_control);
        }

        let content_type = mime::content_type_for(file_path);

        match http::parse_range_header(req.range.as_deref(), total_size) {
            RangeParseResult::Valid(range) => {
                let slice = content[range.start..=range.end].to_vec();
                build_partial_response(
                    slice,
                    content_type,
                    &validators,
                    (range.start, range.end, total_size),
                    req.is_head,
                )
            }
            RangeParseResult::NotSatisfiable => http::build_416_response(total_size),
            RangeParseResult::None => {
                build_cached_response(content, content_type, &validators, req.is_head)
            }
        }
    }
}

/// A relative root missing from the working directory falls back to the
/// directory holding the executable, when it exists there.
fn resolve_root(root: &Path, exe_dir: Option<&Path>) -> PathBuf {
    if root.is_absolute() || root.exists() {
        return root.to_path_buf();
    }
    exe_dir
        .map(|dir| dir.join(root))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| root.to_path_buf())
}

/// Decode the URL path and turn it into a relative filesystem path
fn sanitize_path(path: &str) -> SafePath {
    let Ok(decoded) = percent_decode_str(path).decode_utf8() else {
        return SafePath::Forbidden;
    };
    if decoded.contains('\0') || decoded.contains('\\') {
        return SafePath::Forbidden;
    }

    let mut relative = PathBuf::new();
    let mut hidden = false;
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return SafePath::Forbidden,
            s => {
                // Reject anything the platform would treat as a root or prefix
                if !matches!(Path::new(s).components().next(), Some(Component::Normal(_))) {
                    return SafePath::Forbidden;
                }
                if s.starts_with('.') {
                    hidden = true;
                }
                relative.push(s);
            }
        }
    }

    if hidden {
        SafePath::Hidden
    } else {
        SafePath::Relative(relative)
    }
}

/// Metadata for a path, `Ok(None)` when it does not exist
async fn lookup(path: &Path) -> io::Result<Option<Metadata>> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if is_not_found(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

fn is_not_found(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

fn read_failure(path: &Path, e: &io::Error) -> Response<ResponseBody> {
    logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
    http::build_500_response()
}
