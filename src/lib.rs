//! Frontend gateway: serves a static site and forwards a path prefix to an
//! upstream HTTP service.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
