use crate::config::TokenConfig;
use crate::error::ApiError;
use crate::models::DeviceName;
use crate::routes;
use crate::state::AppState;
use crate::store::DeviceStore;
use axum::{
    body::{Body, Bytes},
    extract::{rejection::PathRejection, Path, Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, HeaderValue, Method,
    },
    response::Response,
};

/// Resolve the device name from the path, or fail as an unmatched route
fn device_name(path: Result<Path<String>, PathRejection>) -> Result<DeviceName, ApiError> {
    path.ok()
        .and_then(|Path(raw)| DeviceName::parse(&raw))
        .ok_or(ApiError::RouteNotFound)
}

/// GET /device/{name} handler - Fetch the last reported address
#[utoipa::path(
    get,
    path = routes::DEVICE_ITEM,
    params(
        ("name" = String, Path, description = "Device name: letters, digits, '_' and '-'")
    ),
    responses(
        (status = 200, description = "Stored address followed by a newline", body = String, content_type = "text/plain"),
        (status = 404, description = "No address set, or the path did not match", body = String, content_type = "text/plain")
    ),
    tag = "device"
)]
pub async fn read_device(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let name = device_name(path)?;

    let store = state.directory.for_read(&name);
    forward(&store, Method::GET, None, Bytes::new()).await
}

/// POST /device/{name} handler - Report the current address for a device
///
/// Requires `Authorization: Bearer <token>` matching the device's own token,
/// or the default token when the device has none.
#[utoipa::path(
    post,
    path = routes::DEVICE_ITEM,
    params(
        ("name" = String, Path, description = "Device name: letters, digits, '_' and '-'")
    ),
    request_body(
        content = String,
        description = "IPv4 literal as plain text, or a form body with an `ip` field",
        content_type = "text/plain"
    ),
    responses(
        (status = 200, description = "Address stored", body = String, content_type = "text/plain"),
        (status = 400, description = "Body is not a valid IPv4 address", body = String, content_type = "text/plain"),
        (status = 401, description = "Missing or wrong bearer token", body = String, content_type = "text/plain"),
        (status = 404, description = "Path did not match", body = String, content_type = "text/plain")
    ),
    tag = "device"
)]
pub async fn write_device(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let name = device_name(path)?;
    authorize(&state.config.tokens, &name, &headers)?;

    let store = state.directory.get_or_create(&name);
    forward(&store, Method::POST, headers.get(CONTENT_TYPE), body).await
}

/// Every other method on /device/{name}
pub async fn reject_method(
    path: Result<Path<String>, PathRejection>,
    method: Method,
) -> ApiError {
    match device_name(path) {
        Ok(name) => {
            tracing::debug!("Rejected {} for device {}", method, name);
            ApiError::MethodNotAllowed
        }
        Err(e) => e,
    }
}

fn authorize(tokens: &TokenConfig, name: &DeviceName, headers: &HeaderMap) -> Result<(), ApiError> {
    let authorization = headers.get(AUTHORIZATION).map(HeaderValue::as_bytes);
    if tokens.authorizes(name, authorization) {
        Ok(())
    } else {
        tracing::warn!("Unauthorized write attempt for device {}", name);
        Err(ApiError::Unauthorized)
    }
}

/// Hand the request to the store, keeping the body verbatim and defaulting the content type
async fn forward(
    store: &DeviceStore,
    method: Method,
    content_type: Option<&HeaderValue>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let content_type = content_type
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("text/plain"));

    tracing::debug!("Forwarding {} to store for device {}", method, store.name());

    let request = Request::builder()
        .method(method)
        .uri("/")
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .map_err(|e| ApiError::Storage(e.into()))?;

    Ok(store.fetch(request).await)
}
