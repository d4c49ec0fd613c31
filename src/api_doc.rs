use utoipa::OpenApi;

use crate::error::{HealthResponse, UnhealthyResponse};
use crate::handlers;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "device-ip-registry API",
        version = "1.0.0",
        description = "Devices report their current IPv4 address by name; readers fetch the latest one"
    ),
    paths(
        handlers::health::health_handler,
        handlers::device::read_device,
        handlers::device::write_device
    ),
    components(
        schemas(
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "device", description = "Device address operations")
    )
)]
pub struct ApiDoc;
