use std::sync::Arc;

use crate::config::{Config, MessagesConfig};
use crate::discord::ChatGateway;
use crate::parsers::MazeDefaults;
use crate::prefix::PrefixService;

/// Everything a worker needs to answer an event. Built once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub prefixes: Arc<PrefixService>,
    pub gateway: Arc<dyn ChatGateway>,
}

impl AppContext {
    pub fn new(
        config: Arc<Config>,
        prefixes: Arc<PrefixService>,
        gateway: Arc<dyn ChatGateway>,
    ) -> Self {
        Self {
            config,
            prefixes,
            gateway,
        }
    }

    pub fn messages(&self) -> &MessagesConfig {
        &self.config.messages
    }

    pub fn maze_defaults(&self) -> MazeDefaults {
        MazeDefaults::from(&self.config.general)
    }
}
