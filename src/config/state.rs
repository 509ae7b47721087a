// Application state module
// Immutable configuration plus the handler chain built from it

use super::types::Config;
use crate::error::StartupError;
use crate::handler::{Chain, PrefixProxy, Stage, StaticFiles};

/// Application state shared by every connection
pub struct AppState {
    pub config: Config,
    pub chain: Chain,
}

impl AppState {
    /// Build the static stage followed by the proxy stage
    pub fn new(config: Config) -> Result<Self, StartupError> {
        let chain = Chain::new(vec![
            Stage::Static(StaticFiles::new(&config.static_files)?),
            Stage::Proxy(PrefixProxy::new(&config.proxy)?),
        ]);

        Ok(Self { config, chain })
    }
}
