// Application state module
// Shared, read-only state handed to every connection

use super::types::Config;
use crate::pgn::PgnStore;
use crate::routing::RouteTable;

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: PgnStore,
    pub routes: RouteTable,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = PgnStore::from_config(&config.storage);
        let routes = RouteTable::new(&config.health);
        Self {
            config,
            store,
            routes,
        }
    }
}
