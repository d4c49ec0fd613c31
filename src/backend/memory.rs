use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::RecordBackend;
use crate::models::{AddressRecord, DeviceId};

/// In-memory record storage
///
/// Records live in a sharded map and are lost on restart. Devices hashed to
/// different shards never wait on each other.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<DashMap<DeviceId, AddressRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    async fn get(&self, id: DeviceId) -> Result<Option<AddressRecord>> {
        Ok(self.inner.get(&id).map(|record| record.value().clone()))
    }

    async fn put(&self, id: DeviceId, record: &AddressRecord) -> Result<()> {
        self.inner.insert(id, record.clone());
        tracing::debug!("Stored record for device {} ({})", record.device, id);
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceName;

    fn record(name: &str, ip: &str) -> (DeviceId, AddressRecord) {
        let name = DeviceName::parse(name).unwrap();
        (name.id(), AddressRecord::new(&name, ip.to_string()))
    }

    #[tokio::test]
    async fn test_get_missing_record() {
        let backend = MemoryBackend::new();
        let (id, _) = record("router1", "1.2.3.4");

        assert!(backend.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_record() {
        let backend = MemoryBackend::new();
        let (id, first) = record("router1", "1.2.3.4");
        let (_, second) = record("router1", "5.6.7.8");

        backend.put(id, &first).await.unwrap();
        backend.put(id, &second).await.unwrap();

        assert_eq!(backend.get(id).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let backend = MemoryBackend::new();
        let (id1, rec1) = record("router1", "1.2.3.4");
        let (id2, _) = record("router2", "5.6.7.8");

        backend.put(id1, &rec1).await.unwrap();

        assert!(backend.get(id2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let backend = MemoryBackend::new();
        let clone = backend.clone();
        let (id, rec) = record("router1", "1.2.3.4");

        backend.put(id, &rec).await.unwrap();

        assert_eq!(clone.get(id).await.unwrap(), Some(rec));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_to_different_devices() {
        let backend = MemoryBackend::new();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let backend = backend.clone();
                tokio::spawn(async move {
                    let (id, rec) = record(&format!("device{}", i), &format!("10.0.0.{}", i));
                    backend.put(id, &rec).await.unwrap();
                    id
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let id = handle.await.unwrap();
            let stored = backend.get(id).await.unwrap().unwrap();
            assert_eq!(stored.ip, format!("10.0.0.{}", i));
        }
    }
}
