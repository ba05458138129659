use crate::file_config::FileConfig;
use crate::geo::NeighborhoodResolver;
use crate::store::FaultStore;
use std::sync::Arc;

/// Central dependency container passed to all handlers.
///
/// Built once in `main`; the store's connection pool and the resolver's HTTP
/// client are shared by every request.
#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn FaultStore>,
    pub resolver: Arc<dyn NeighborhoodResolver>,
    pub file_config: Arc<FileConfig>,
}

impl ServerDeps {
    pub fn new(
        store: Arc<dyn FaultStore>,
        resolver: Arc<dyn NeighborhoodResolver>,
        file_config: Arc<FileConfig>,
    ) -> Self {
        Self {
            store,
            resolver,
            file_config,
        }
    }

    pub fn top_n(&self) -> usize {
        self.file_config.report.top_n
    }
}
