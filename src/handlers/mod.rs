pub mod device;
pub mod health;

use crate::error::ApiError;

pub use device::{read_device, reject_method, write_device};
pub use health::health_handler;

/// Fallback for every path that matches no route
pub async fn not_found_handler() -> ApiError {
    ApiError::RouteNotFound
}
