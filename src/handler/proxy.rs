//! Prefix proxy module
//!
//! Forwards requests under a fixed path prefix to the upstream service with
//! the prefix stripped, replacing `Host` with the upstream authority.

use std::net::SocketAddr;
use std::time::Duration;

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, HOST};
use hyper::http::uri::{Authority, Scheme};
use hyper::{Request, Response, Uri, Version};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::config::{self, ProxyConfig};
use crate::error::{ProxyError, StartupError};
use crate::http::{self, headers, ResponseBody};
use crate::logger;

/// Forwarder for one prefix and one upstream
pub struct PrefixProxy {
    prefix: String,
    target: String,
    scheme: Scheme,
    authority: Authority,
    /// Path of the upstream base URL without trailing slash, may be empty
    base_path: String,
    host_header: HeaderValue,
    timeout: Duration,
    client: Client<HttpConnector, Incoming>,
}

impl PrefixProxy {
    pub fn new(config: &ProxyConfig) -> Result<Self, StartupError> {
        let upstream = config::parse_upstream(&config.target)?;
        let invalid = |reason: String| StartupError::Upstream {
            url: config.target.clone(),
            reason,
        };

        let scheme = upstream.scheme().cloned().unwrap_or(Scheme::HTTP);
        let authority = upstream
            .authority()
            .cloned()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let host_header = HeaderValue::from_str(authority.as_str())
            .map_err(|e| invalid(e.to_string()))?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            prefix: config.prefix.clone(),
            target: config.target.clone(),
            scheme,
            authority,
            base_path: upstream.path().trim_end_matches('/').to_string(),
            host_header,
            timeout: Duration::from_secs(config.timeout),
            client,
        })
    }

    /// True when `path` is the prefix itself or lies below it
    pub fn matches(&self, path: &str) -> bool {
        self.rewrite_path(path).is_some()
    }

    /// Strip the prefix: `/api/generate` -> `/generate`, `/api` -> `/`.
    ///
    /// `None` when the path is outside the prefix (including `/apix`).
    pub fn rewrite_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Upstream URI for an already rewritten path and the original query
    pub fn target_uri(&self, rest: &str, query: Option<&str>) -> Result<Uri, hyper::http::Error> {
        let path_and_query = match query {
            Some(q) => format!("{}{rest}?{q}", self.base_path),
            None => format!("{}{rest}", self.base_path),
        };
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }

    /// Forward the request and relay the upstream response.
    ///
    /// Failures are answered with 502/504 and logged; they are never retried.
    pub async fn forward(&self, req: Request<Incoming>, peer: SocketAddr) -> Response<ResponseBody> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match self.send(req).await {
            Ok(response) => response,
            Err(e) => {
                logger::log_proxy_error(&method, &path, &self.target, peer, &e);
                http::build_gateway_error_response(e.status())
            }
        }
    }

    async fn send(&self, req: Request<Incoming>) -> Result<Response<ResponseBody>, ProxyError> {
        let (mut parts, body) = req.into_parts();

        let rest = self.rewrite_path(parts.uri.path()).unwrap_or("/");
        let target = self.target_uri(rest, parts.uri.query())?;

        headers::strip_hop_by_hop(&mut parts.headers);
        parts.headers.insert(HOST, self.host_header.clone());
        parts.uri = target;
        parts.version = Version::HTTP_11;

        let upstream_req = Request::from_parts(parts, body);
        let response = tokio::time::timeout(self.timeout, self.client.request(upstream_req))
            .await
            .map_err(|_| ProxyError::Timeout(self.timeout))??;

        let (mut parts, body) = response.into_parts();
        headers::strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, body.boxed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy(target: &str) -> PrefixProxy {
        PrefixProxy::new(&ProxyConfig {
            target: target.to_string(),
            prefix: "/api".to_string(),
            timeout: 5,
            connect_timeout: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_rewrite_path() {
        let proxy = proxy("http://localhost:8000");
        assert_eq!(proxy.rewrite_path("/api/generate"), Some("/generate"));
        assert_eq!(proxy.rewrite_path("/api/v1/items/"), Some("/v1/items/"));
        assert_eq!(proxy.rewrite_path("/api/"), Some("/"));
        assert_eq!(proxy.rewrite_path("/api"), Some("/"));
        assert_eq!(proxy.rewrite_path("/apix"), None);
        assert_eq!(proxy.rewrite_path("/static/api"), None);
        assert_eq!(proxy.rewrite_path("/"), None);
    }

    #[test]
    fn test_target_uri() {
        let proxy = proxy("http://localhost:8000");
        assert_eq!(
            proxy.target_uri("/generate", None).unwrap(),
            "http://localhost:8000/generate"
        );
        assert_eq!(
            proxy.target_uri("/generate", Some("model=flash&n=2")).unwrap(),
            "http://localhost:8000/generate?model=flash&n=2"
        );
    }

    #[test]
    fn test_target_uri_keeps_base_path() {
        let proxy = proxy("http://backend:9000/v1/");
        assert_eq!(
            proxy.target_uri("/generate", None).unwrap(),
            "http://backend:9000/v1/generate"
        );
        assert_eq!(proxy.target_uri("/", None).unwrap(), "http://backend:9000/v1/");
    }

    #[test]
    fn test_host_header_is_upstream_authority() {
        assert_eq!(proxy("http://localhost:8000").host_header, "localhost:8000");
        assert_eq!(proxy("http://backend").host_header, "backend");
    }

    #[test]
    fn test_rejects_https_upstream() {
        let result = PrefixProxy::new(&ProxyConfig {
            target: "https://example.com".to_string(),
            prefix: "/api".to_string(),
            timeout: 5,
            connect_timeout: 1,
        });
        assert!(matches!(result, Err(StartupError::Upstream { .. })));
    }

    /// Log sink shared between the subscriber and the test
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_unreachable_upstream_logs_warning() {
        use http_body_util::Empty;
        use hyper::body::Bytes;
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::StatusCode;
        use hyper_util::rt::TokioIo;
        use std::sync::Arc;

        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        // Current-thread runtime, so every spawned task sees this subscriber
        let _guard = tracing::subscriber::set_default(subscriber);

        let closed = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let target = format!("http://{closed}");
        let forwarder = Arc::new(proxy(&target));

        // Forwarding needs a real `Incoming` body, so go through a listener
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, peer) = listener.accept().await.unwrap();
            let service = service_fn(move |req| {
                let forwarder = Arc::clone(&forwarder);
                async move { Ok::<_, std::convert::Infallible>(forwarder.forward(req, peer).await) }
            });
            let _ = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await;
        });

        let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();
        let req = Request::builder()
            .method("PUT")
            .uri(format!("http://{addr}/api/generate?n=1"))
            .body(Empty::new())
            .unwrap();
        let response = client.request(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let logs = captured.text();
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("PUT"), "{logs}");
        assert!(logs.contains("/api/generate"), "{logs}");
        assert!(logs.contains(&target), "{logs}");
        assert!(logs.contains("127.0.0.1"), "{logs}");
    }
}
