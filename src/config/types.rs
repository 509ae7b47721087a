// Configuration types module
// Typed sections deserialized from the layered `config` sources

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticConfig,
    pub proxy: ProxyConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads, CPU count when unset
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Static asset serving
#[derive(Debug, Deserialize, Clone)]
pub struct StaticConfig {
    /// Directory searched for files. A relative path is looked up in the working
    /// directory first, then next to the executable.
    pub root: String,
    /// Default document for directory requests
    pub index: String,
    /// `max-age` in seconds for the `Cache-Control` header
    pub max_age: u32,
}

/// Prefix forwarding to the upstream service
#[derive(Debug, Deserialize, Clone)]
pub struct ProxyConfig {
    /// Upstream base URL, e.g. `http://localhost:8000`
    pub target: String,
    /// Path prefix that is stripped before forwarding
    pub prefix: String,
    /// Seconds to wait for upstream response headers before answering 504
    pub timeout: u64,
    /// Seconds allowed for the TCP connect to the upstream
    pub connect_timeout: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, `RUST_LOG` wins when set
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
}

/// Connection handling limits
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Seconds allowed for a client to send the full request head
    pub header_read_timeout: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
}
