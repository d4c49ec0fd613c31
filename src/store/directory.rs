use dashmap::DashMap;
use std::sync::Arc;

use super::DeviceStore;
use crate::backend::RecordBackend;
use crate::models::{DeviceId, DeviceName};

/// Directory of per-device stores, keyed by [`DeviceId`]
///
/// Entries are sharded, so lookups for different devices do not wait on each
/// other. Only writes register a store; reads of a device that has no entry go
/// through a detached store that is dropped with the request.
#[derive(Clone)]
pub struct StoreDirectory {
    backend: Arc<dyn RecordBackend>,
    stores: Arc<DashMap<DeviceId, Arc<DeviceStore>>>,
}

impl StoreDirectory {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            backend,
            stores: Arc::new(DashMap::new()),
        }
    }

    /// Return the store owning `name`, registering it if this is the first write
    ///
    /// The entry is created under the shard lock for the deterministic id, so
    /// concurrent first writers for the same name share one store.
    pub fn get_or_create(&self, name: &DeviceName) -> Arc<DeviceStore> {
        let id = name.id();
        self.stores
            .entry(id)
            .or_insert_with(|| {
                tracing::debug!("Creating store for device {} ({})", name, id);
                Arc::new(DeviceStore::new(name.clone(), Arc::clone(&self.backend)))
            })
            .value()
            .clone()
    }

    /// The registered store for `name`, without registering one
    pub fn get(&self, name: &DeviceName) -> Option<Arc<DeviceStore>> {
        self.stores.get(&name.id()).map(|store| Arc::clone(store.value()))
    }

    /// Store to serve a read: the registered one, or a detached one over the same backend
    pub fn for_read(&self, name: &DeviceName) -> Arc<DeviceStore> {
        self.get(name).unwrap_or_else(|| {
            Arc::new(DeviceStore::new(name.clone(), Arc::clone(&self.backend)))
        })
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.stores.len()
    }
}
