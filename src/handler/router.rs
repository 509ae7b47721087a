//! Request entry module
//!
//! Entry point for HTTP request processing: runs the handler chain and
//! writes the access log line.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::body::{Body, Incoming};
use hyper::header::{HeaderName, CONTENT_LENGTH, REFERER, USER_AGENT};
use hyper::{Request, Response, Version};

use crate::config::AppState;
use crate::http::ResponseBody;
use crate::logger::{self, AccessLogEntry};

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let logging = &state.config.logging;
    if !logging.access_log {
        let (response, _) = state.chain.dispatch(req, peer).await;
        return Ok(response);
    }

    let started = Instant::now();
    let mut entry = access_entry(&req, peer);

    let (response, handler) = state.chain.dispatch(req, peer).await;

    entry.status = response.status().as_u16();
    entry.body_bytes = body_size(&response);
    entry.handler = handler;
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    logger::log_access(&entry, &logging.access_log_format);

    Ok(response)
}

/// Request half of the access log line
fn access_entry(req: &Request<Incoming>, peer: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

/// Declared length, falling back to the body's exact size hint
fn body_size(response: &Response<ResponseBody>) -> u64 {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| response.body().size_hint().exact())
        .unwrap_or(0)
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_label() {
        assert_eq!(version_label(Version::HTTP_10), "1.0");
        assert_eq!(version_label(Version::HTTP_11), "1.1");
        assert_eq!(version_label(Version::HTTP_2), "2");
    }

    #[test]
    fn test_body_size_prefers_content_length() {
        let mut response = crate::http::build_404_response();
        assert_eq!(body_size(&response), 13);

        response
            .headers_mut()
            .insert(CONTENT_LENGTH, hyper::header::HeaderValue::from_static("99"));
        assert_eq!(body_size(&response), 99);
    }
}
