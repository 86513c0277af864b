//! Storage factory for creating storage instances

use super::backends::MemoryBackend;
#[cfg(feature = "mysql")]
use super::backends::MySqlBackend;
use super::config::{BackendType, StorageConfig};
use super::error::StorageResult;
use super::traits::Store;

/// Factory for creating storage instances
pub struct StorageFactory;

impl StorageFactory {
    /// Create storage from explicit configuration
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Box<dyn Store>> {
        match config.backend {
            BackendType::Memory => {
                let backend = MemoryBackend::new(config).await?;
                Ok(Box::new(backend))
            }
            #[cfg(feature = "mysql")]
            BackendType::MySql => {
                let backend = MySqlBackend::new(config).await?;
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "mysql"))]
            BackendType::MySql => Err(super::error::StorageError::configuration(
                "MySQL backend not enabled. Enable with --features mysql",
            )),
        }
    }
}
