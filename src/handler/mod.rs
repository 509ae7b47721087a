//! Request handler module
//!
//! Requests run through an ordered chain of stages. Each stage either answers
//! the request or hands it to the next one; a request nobody answers gets 404.

pub mod proxy;
pub mod router;
pub mod static_files;

use std::net::SocketAddr;

use hyper::body::Incoming;
use hyper::{Request, Response};

use crate::http::{self, ResponseBody};

pub use proxy::PrefixProxy;
pub use router::handle_request;
pub use static_files::{FileRequest, StaticFiles};

/// Result of offering a request to one stage
pub enum Outcome {
    Handled(Response<ResponseBody>),
    Pass(Request<Incoming>),
}

/// One link of the chain
pub enum Stage {
    Static(StaticFiles),
    Proxy(PrefixProxy),
}

impl Stage {
    /// Short name used in access logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Static(_) => "static",
            Self::Proxy(_) => "proxy",
        }
    }

    async fn handle(&self, req: Request<Incoming>, peer: SocketAddr) -> Outcome {
        match self {
            Self::Static(files) => {
                let Some(file_req) = FileRequest::from_request(&req) else {
                    return Outcome::Pass(req);
                };
                match files.serve(file_req).await {
                    Some(response) => Outcome::Handled(response),
                    None => Outcome::Pass(req),
                }
            }
            Self::Proxy(proxy) => {
                if proxy.matches(req.uri().path()) {
                    Outcome::Handled(proxy.forward(req, peer).await)
                } else {
                    Outcome::Pass(req)
                }
            }
        }
    }
}

/// Ordered list of stages, evaluated first to last
pub struct Chain {
    stages: Vec<Stage>,
}

impl Chain {
    pub const fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Run the request through the chain.
    ///
    /// Returns the response and the name of the stage that produced it
    /// (`none` for the terminal 404).
    pub async fn dispatch(
        &self,
        req: Request<Incoming>,
        peer: SocketAddr,
    ) -> (Response<ResponseBody>, &'static str) {
        let mut req = req;
        for stage in &self.stages {
            match stage.handle(req, peer).await {
                Outcome::Handled(response) => return (response, stage.name()),
                Outcome::Pass(next) => req = next,
            }
        }
        (http::build_404_response(), "none")
    }
}
