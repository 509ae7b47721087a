//! HTTP response building module
//!
//! Provides builders for the status responses produced by the server itself.

use hyper::{Response, StatusCode};

use super::{empty, full, ResponseBody};

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str, last_modified: &str, cache_control: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", etag)
        .header("Last-Modified", last_modified)
        .header("Cache-Control", cache_control)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(empty())
        })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ResponseBody> {
    build_text_response(StatusCode::NOT_FOUND)
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<ResponseBody> {
    build_text_response(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Build 502/504 response for a failed upstream exchange
pub fn build_gateway_error_response(status: StatusCode) -> Response<ResponseBody> {
    build_text_response(status)
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: usize) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Range", format!("bytes */{file_size}"))
        .body(full("416 Range Not Satisfiable"))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(empty())
        })
}

/// Build 301 redirect response
pub fn build_redirect_response(location: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header("Location", location)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(full(format!("Redirecting to {location}")))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            build_404_response()
        })
}

/// Build 200 response carrying file content
pub fn build_cached_response(
    data: Vec<u8>,
    content_type: &str,
    validators: &Validators<'_>,
    is_head: bool,
) -> Response<ResponseBody> {
    let content_length = data.len();
    let body = if is_head { empty() } else { full(data) };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("Accept-Ranges", "bytes")
        .header("ETag", validators.etag)
        .header("Last-Modified", validators.last_modified)
        .header("Cache-Control", validators.cache_control)
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            build_500_response()
        })
}

/// Build 206 Partial Content response
pub fn build_partial_response(
    data: Vec<u8>,
    content_type: &str,
    validators: &Validators<'_>,
    (start, end, total_size): (usize, usize, usize),
    is_head: bool,
) -> Response<ResponseBody> {
    let content_length = end - start + 1;
    let body = if is_head { empty() } else { full(data) };

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("Content-Range", format!("bytes {start}-{end}/{total_size}"))
        .header("Accept-Ranges", "bytes")
        .header("ETag", validators.etag)
        .header("Last-Modified", validators.last_modified)
        .header("Cache-Control", validators.cache_control)
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("206", &e);
            build_500_response()
        })
}

/// Cache validators attached to every file response
pub struct Validators<'a> {
    pub etag: &'a str,
    pub last_modified: &'a str,
    pub cache_control: &'a str,
}

/// Plain-text response whose body is the status line, e.g. `404 Not Found`
fn build_text_response(status: StatusCode) -> Response<ResponseBody> {
    let text = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    );
    let mut response = Response::new(full(text));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_404_body() {
        let response = build_404_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"404 Not Found");
    }

    #[test]
    fn test_gateway_statuses() {
        assert_eq!(
            build_gateway_error_response(StatusCode::BAD_GATEWAY).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            build_gateway_error_response(StatusCode::GATEWAY_TIMEOUT).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_redirect_location() {
        let response = build_redirect_response("/docs/?v=1");
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()["location"], "/docs/?v=1");
    }

    #[test]
    fn test_416_content_range() {
        let response = build_416_response(42);
        assert_eq!(response.headers()["content-range"], "bytes */42");
    }
}
