//! Error types
//!
//! Startup failures terminate the process before any connection is accepted.
//! Proxy failures are answered per request with a gateway status.

use hyper::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration or binding the listener.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    ListenAddr {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("invalid upstream URL '{url}': {reason}")]
    Upstream { url: String, reason: String },

    #[error("invalid proxy prefix '{0}': must start with '/' and not end with '/'")]
    Prefix(String),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("static root '{}' is not usable: {source}", path.display())]
    StaticRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Errors raised while forwarding a request upstream.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to build upstream request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

impl ProxyError {
    /// Gateway status answered to the client for this failure.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Request(_) | Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_maps_to_504() {
        let err = ProxyError::Timeout(Duration::from_secs(30));
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn test_request_error_maps_to_502() {
        let err = hyper::Request::builder()
            .uri("http://[::1")
            .body(())
            .unwrap_err();
        assert_eq!(ProxyError::from(err).status(), StatusCode::BAD_GATEWAY);
    }
}
