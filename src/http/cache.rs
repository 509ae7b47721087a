//! HTTP cache control module
//!
//! Provides `ETag` / `Last-Modified` generation and conditional request handling.

use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generate a weak `ETag` from file size and modification time
///
/// # Returns
/// Quoted weak `ETag` string, e.g. `W/"1a-18c2f0e4d10"`
pub fn generate_etag(size: u64, modified: SystemTime) -> String {
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    format!("W/\"{size:x}-{millis:x}\"")
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Uses weak comparison, so `W/"x"` and `"x"` are equal.
/// Supports lists (`"a", "b"`) and the `*` wildcard.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    let ours = strip_weak(etag);
    if_none_match.is_some_and(|client_etag| {
        client_etag
            .split(',')
            .map(str::trim)
            .any(|e| e == "*" || strip_weak(e) == ours)
    })
}

fn strip_weak(etag: &str) -> &str {
    etag.strip_prefix("W/").unwrap_or(etag)
}

/// Format a timestamp as an HTTP date (`Sun, 06 Nov 1994 08:49:37 GMT`)
pub fn format_http_date(time: SystemTime) -> String {
    let time: DateTime<Utc> = time.into();
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// True when the resource has not changed since the client's `If-Modified-Since`
///
/// HTTP dates have one-second resolution, sub-second mtimes are truncated.
pub fn not_modified_since(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    let Some(since) = if_modified_since
        .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
    else {
        return false;
    };
    let modified: DateTime<Utc> = modified.into();
    modified.timestamp() <= since.timestamp()
}

/// `Cache-Control` value for static files
pub fn cache_control(max_age: u32) -> String {
    format!("public, max-age={max_age}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generate_etag() {
        let etag = generate_etag(26, UNIX_EPOCH + Duration::from_millis(4096));
        assert_eq!(etag, "W/\"1a-1000\"");
    }

    #[test]
    fn test_etag_changes_with_mtime() {
        let a = generate_etag(10, UNIX_EPOCH + Duration::from_secs(1));
        let b = generate_etag(10, UNIX_EPOCH + Duration::from_secs(2));
        assert_ne!(a, b);
    }

    #[test]
    fn test_check_etag_match() {
        let etag = "W/\"abc123\"";
        assert!(check_etag_match(Some("W/\"abc123\""), etag));
        assert!(check_etag_match(Some("\"abc123\""), etag));
        assert!(check_etag_match(Some("\"xyz\", W/\"abc123\""), etag));
        assert!(check_etag_match(Some("*"), etag));
        assert!(!check_etag_match(Some("\"different\""), etag));
        assert!(!check_etag_match(None, etag));
    }

    #[test]
    fn test_format_http_date() {
        let time = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(format_http_date(time), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_not_modified_since() {
        let modified = UNIX_EPOCH + Duration::from_millis(784_111_777_500);
        assert!(not_modified_since(Some("Sun, 06 Nov 1994 08:49:37 GMT"), modified));
        assert!(not_modified_since(Some("Mon, 07 Nov 1994 08:49:37 GMT"), modified));
        assert!(!not_modified_since(Some("Sat, 05 Nov 1994 08:49:37 GMT"), modified));
        assert!(!not_modified_since(Some("garbage"), modified));
        assert!(!not_modified_since(None, modified));
    }

    #[test]
    fn test_cache_control() {
        assert_eq!(cache_control(0), "public, max-age=0");
        assert_eq!(cache_control(3600), "public, max-age=3600");
    }
}
