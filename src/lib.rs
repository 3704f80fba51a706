pub mod config;
pub mod error;
pub mod rest;
pub mod storage;
pub mod tasks;

use std::sync::Arc;

use config::ServerConfig;
use storage::TaskStore;
use tasks::TaskService;

/// Shared application state passed to every request handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    /// Validated task operations over the SQLite store.
    pub tasks: TaskService,
    pub started_at: std::time::Instant,
}

impl AppContext {
    pub fn new(config: Arc<ServerConfig>, store: TaskStore) -> Self {
        Self {
            config,
            tasks: TaskService::new(store),
            started_at: std::time::Instant::now(),
        }
    }
}
