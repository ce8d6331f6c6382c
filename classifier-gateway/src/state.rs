//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::gateway::Gateway;

/// Shared application state passed to all handlers.
pub struct AppState {
    pub config: Config,
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(config: Config, gateway: Arc<Gateway>) -> Self {
        Self { config, gateway }
    }
}
