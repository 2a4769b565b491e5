//! Application state shared across handlers.

use filedrop_core::config::AppConfig;
use filedrop_registry::{FileRegistry, LinkIssuer};
use filedrop_storage::BlobStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Blob storage backend.
    pub storage: Arc<dyn BlobStore>,
    /// File registry.
    pub registry: Arc<FileRegistry>,
    /// One-time link issuer.
    pub links: Arc<LinkIssuer>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: AppConfig, storage: Arc<dyn BlobStore>) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            registry: Arc::new(FileRegistry::new()),
            links: Arc::new(LinkIssuer::new()),
        }
    }
}
