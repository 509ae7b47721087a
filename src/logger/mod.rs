//! Logger module
//!
//! Provides logging utilities for the HTTP server including:
//! - Startup banner on stdout
//! - Diagnostics through `tracing` (stderr)
//! - Access logging with multiple formats

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use std::net::SocketAddr;

use hyper::Method;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LoggingConfig};
use crate::error::{ProxyError, StartupError};

/// Initialize diagnostics and the access log writer
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> Result<(), StartupError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| StartupError::Logging(format!("invalid level '{}': {e}", config.level)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| StartupError::Logging(e.to_string()))?;

    if config.access_log {
        writer::init(config.access_log_file.as_deref()).map_err(|e| {
            StartupError::Logging(format!("cannot open access log: {e}"))
        })?;
    }
    Ok(())
}

/// The two startup lines; stdout, not tracing, so they show regardless of level
pub fn log_server_start(config: &Config) {
    println!(
        "Frontend server running: http://localhost:{}",
        config.server.port
    );
    println!("Proxying {} -> {}", config.proxy.prefix, config.proxy.target);
}

pub fn log_connection_error(err: &hyper::Error) {
    tracing::debug!(error = %err, "failed to serve connection");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

/// Failed upstream exchange, with enough detail to trace the client
pub fn log_proxy_error(
    method: &Method,
    path: &str,
    target: &str,
    client: SocketAddr,
    err: &ProxyError,
) {
    tracing::warn!(
        %method,
        path,
        target,
        %client,
        status = err.status().as_u16(),
        "error occurred while proxying request: {err}"
    );
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(writer) => writer.write_access(&line),
        None => println!("{line}"),
    }
}
