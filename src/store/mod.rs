pub mod address;
pub mod directory;

use axum::{
    extract::Request,
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::backend::RecordBackend;
use crate::error::{plain_text, ApiError};
use crate::models::{AddressRecord, DeviceId, DeviceName};

pub use directory::StoreDirectory;

/// Largest write body read by a store; an address or `ip=` form is far smaller
const MAX_BODY_BYTES: usize = 1024;

/// Exclusive owner of the address record for one device
///
/// All reads and writes go through `lock`, so a write has validated and
/// persisted before any later read or write on the same device runs. Stores
/// for different devices share nothing but the backend handle.
pub struct DeviceStore {
    name: DeviceName,
    id: DeviceId,
    backend: Arc<dyn RecordBackend>,
    lock: Mutex<()>,
}

impl DeviceStore {
    pub fn new(name: DeviceName, backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            id: name.id(),
            name,
            backend,
            lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &DeviceName {
        &self.name
    }

    /// Validate `raw` and replace the stored address with it
    ///
    /// Invalid input is rejected before the lock is taken, leaving the stored
    /// record untouched.
    pub async fn write(&self, raw: &str) -> Result<AddressRecord, ApiError> {
        let Some(ip) = address::parse_address(raw) else {
            tracing::debug!("Rejected invalid address for device {}", self.name);
            return Err(ApiError::InvalidInput);
        };

        let _guard = self.lock.lock().await;
        let record = AddressRecord::new(&self.name, ip);
        self.backend.put(self.id, &record).await?;

        tracing::info!("Stored address {} for device {}", record.ip, self.name);
        Ok(record)
    }

    /// Current record, or [`ApiError::NotSet`] if nothing was written yet
    pub async fn read(&self) -> Result<AddressRecord, ApiError> {
        let _guard = self.lock.lock().await;
        self.backend.get(self.id).await?.ok_or(ApiError::NotSet)
    }

    /// Serve a forwarded request: GET reads, POST writes, anything else is 405
    ///
    /// Responses always carry the no-cache headers, including when the store
    /// is called directly rather than through the router.
    pub async fn fetch(&self, request: Request) -> Response {
        let method = request.method().clone();
        let result = match method {
            Method::GET => self
                .read()
                .await
                .map(|record| format!("{}\n", record.ip)),
            Method::POST => {
                let (parts, body) = request.into_parts();
                match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
                    Ok(bytes) => {
                        let input =
                            address::extract_input(parts.headers.get(CONTENT_TYPE), bytes).await;
                        self.write(&input).await.map(|_| "ok".to_string())
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read body for device {}: {}", self.name, e);
                        Err(ApiError::InvalidInput)
                    }
                }
            }
            _ => Err(ApiError::MethodNotAllowed),
        };

        match result {
            Ok(body) => plain_text(StatusCode::OK, body),
            Err(e) => e.into_response(),
        }
    }
}
