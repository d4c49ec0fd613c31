use crate::backend::RecordBackend;
use crate::config::Config;
use crate::store::StoreDirectory;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn RecordBackend>,
    pub directory: StoreDirectory,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            directory: StoreDirectory::new(Arc::clone(&backend)),
            backend,
            config: Arc::new(config),
        }
    }
}
