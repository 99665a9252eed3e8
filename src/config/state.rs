// Application state module
// Immutable per-process state shared by every connection task

use std::sync::atomic::AtomicUsize;

use super::types::Config;
use crate::storage::Storage;

/// Application state
pub struct AppState {
    pub config: Config,
    pub storage: Storage,

    /// Connections currently being served
    pub active_connections: AtomicUsize,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            storage: Storage::new(&config.storage),
            active_connections: AtomicUsize::new(0),
            config: config.clone(),
        }
    }
}
