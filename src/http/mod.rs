//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality shared by static file
//! serving and the reverse proxy.

pub mod cache;
pub mod headers;
pub mod mime;
pub mod range;
pub mod response;

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;

// Re-export commonly used types
pub use range::parse_range_header;
pub use response::{
    build_304_response, build_404_response, build_416_response, build_500_response,
    build_gateway_error_response, build_redirect_response,
};

/// Body type of every response, either buffered file bytes or a streamed upstream body
pub type ResponseBody = BoxBody<Bytes, hyper::Error>;

/// Wrap buffered bytes as a response body
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Empty response body
pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}
