pub mod memory;
pub mod spanner;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::models::{AddressRecord, DeviceId};

pub use memory::MemoryBackend;
pub use spanner::SpannerBackend;

/// Durable keyed storage for address records
///
/// Implementations must give read-your-writes consistency per key and keep
/// keys isolated from each other. Serializing access to a single key is the
/// caller's job (see [`crate::store::DeviceStore`]).
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Fetch the record for a device, `None` if it was never written
    async fn get(&self, id: DeviceId) -> Result<Option<AddressRecord>>;

    /// Replace the record for a device
    async fn put(&self, id: DeviceId, record: &AddressRecord) -> Result<()>;

    /// Verify that the backend is reachable
    async fn health_check(&self) -> Result<()>;
}

/// Build the backend selected by the configuration
pub async fn from_config(config: &Config) -> Result<Arc<dyn RecordBackend>> {
    match (config.storage_backend, &config.spanner) {
        (StorageBackend::Memory, _) => {
            tracing::info!("Using in-memory record storage");
            Ok(Arc::new(MemoryBackend::new()))
        }
        (StorageBackend::Spanner, Some(spanner)) => {
            Ok(Arc::new(SpannerBackend::from_config(spanner).await?))
        }
        (StorageBackend::Spanner, None) => {
            anyhow::bail!("Spanner backend selected but no Spanner configuration was loaded")
        }
    }
}
