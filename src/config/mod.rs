// Configuration module entry point
// Loads the layered configuration once at startup and validates it

mod state;
mod types;

use std::net::SocketAddr;

use hyper::Uri;

use crate::error::StartupError;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, LoggingConfig, PerformanceConfig, ProxyConfig, ServerConfig, StaticConfig,
};

/// Config file looked up when `FRONTGATE_CONFIG` is unset (extension optional)
pub const DEFAULT_CONFIG_FILE: &str = "config";

impl Config {
    /// Load configuration from the process environment.
    ///
    /// `PORT` and `API_TARGET` take precedence over every other source.
    pub fn load() -> Result<Self, StartupError> {
        let config_path = std::env::var("FRONTGATE_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(
            &config_path,
            non_empty_var("PORT"),
            non_empty_var("API_TARGET"),
        )
    }

    /// Load configuration from a file path (without extension) plus explicit overrides
    pub fn load_from(
        config_path: &str,
        port: Option<String>,
        api_target: Option<String>,
    ) -> Result<Self, StartupError> {
        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("static_files.root", "public")?
            .set_default("static_files.index", "index.html")?
            .set_default("static_files.max_age", 0)?
            .set_default("proxy.target", "http://localhost:8000")?
            .set_default("proxy.prefix", "/api")?
            .set_default("proxy.timeout", 120)?
            .set_default("proxy.connect_timeout", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", false)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.header_read_timeout", 30)?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("FRONTGATE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("server.port", port)?
            .set_override_option("proxy.target", api_target)?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on values that would only break at request time
    fn validate(&self) -> Result<(), StartupError> {
        self.get_socket_addr()?;
        parse_upstream(&self.proxy.target)?;

        let prefix = &self.proxy.prefix;
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            return Err(StartupError::Prefix(prefix.clone()));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, StartupError> {
        let host = &self.server.host;
        let addr = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{}", self.server.port)
        } else {
            format!("{host}:{}", self.server.port)
        };
        addr.parse()
            .map_err(|source| StartupError::ListenAddr { addr, source })
    }
}

/// Parse and check the upstream base URL.
///
/// Only plain `http://` upstreams with an authority are accepted.
pub fn parse_upstream(target: &str) -> Result<Uri, StartupError> {
    let invalid = |reason: &str| StartupError::Upstream {
        url: target.to_string(),
        reason: reason.to_string(),
    };

    let uri: Uri = target.parse().map_err(|e| invalid(&format!("{e}")))?;
    match uri.scheme_str() {
        Some("http") => {}
        Some(other) => return Err(invalid(&format!("unsupported scheme '{other}'"))),
        None => return Err(invalid("missing scheme")),
    }
    if uri.authority().is_none() {
        return Err(invalid("missing host"));
    }
    if uri.query().is_some() {
        return Err(invalid("query strings are not allowed in the base URL"));
    }
    Ok(uri)
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_FILE: &str = "frontgate-test-config-that-does-not-exist";

    #[test]
    fn test_defaults() {
        let cfg = Config::load_from(NO_FILE, None, None).unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.proxy.target, "http://localhost:8000");
        assert_eq!(cfg.proxy.prefix, "/api");
        assert_eq!(cfg.static_files.root, "public");
        assert_eq!(cfg.static_files.index, "index.html");
        assert!(!cfg.logging.access_log);
    }

    #[test]
    fn test_overrides_win() {
        let cfg = Config::load_from(
            NO_FILE,
            Some("4100".to_string()),
            Some("http://backend:9000".to_string()),
        )
        .unwrap();
        assert_eq!(cfg.server.port, 4100);
        assert_eq!(cfg.proxy.target, "http://backend:9000");
    }

    #[test]
    fn test_non_numeric_port_fails() {
        let result = Config::load_from(NO_FILE, Some("abc".to_string()), None);
        assert!(matches!(result, Err(StartupError::Config(_))));
    }

    #[test]
    fn test_out_of_range_port_fails() {
        let result = Config::load_from(NO_FILE, Some("70000".to_string()), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_upstream_fails() {
        let result = Config::load_from(NO_FILE, None, Some("not a url".to_string()));
        assert!(matches!(result, Err(StartupError::Upstream { .. })));
    }

    #[test]
    fn test_parse_upstream() {
        assert!(parse_upstream("http://localhost:8000").is_ok());
        assert!(parse_upstream("http://127.0.0.1:8000/v1").is_ok());
        assert!(parse_upstream("https://example.com").is_err());
        assert!(parse_upstream("localhost:8000").is_err());
        assert!(parse_upstream("/relative").is_err());
        assert!(parse_upstream("http://host/?a=1").is_err());
    }

    #[test]
    fn test_socket_addr_ipv6() {
        let mut cfg = Config::load_from(NO_FILE, None, None).unwrap();
        cfg.server.host = "::".to_string();
        let addr = cfg.get_socket_addr().unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.port(), 3000);
    }
}
