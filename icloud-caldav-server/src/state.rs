use std::sync::Arc;

use icloud_caldav_core::ServerConfig;
use icloud_caldav_provider::Connector;

use crate::tools::ToolSet;

/// Shared application state. Nothing in it changes after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub connector: Arc<dyn Connector>,
    pub tools: Arc<ToolSet>,
}

impl AppState {
    pub fn new(config: ServerConfig, connector: Arc<dyn Connector>) -> Self {
        let tools = ToolSet::for_profile(config.profile);
        AppState {
            config: Arc::new(config),
            connector,
            tools: Arc::new(tools),
        }
    }
}
