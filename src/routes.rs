// Route path constants - single source of truth for all API paths

use axum::{
    http::{
        header::{CACHE_CONTROL, PRAGMA},
        HeaderValue,
    },
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::error::{NO_CACHE, PRAGMA_NO_CACHE};
use crate::handlers::{health_handler, not_found_handler, read_device, reject_method, write_device};
use crate::state::AppState;

pub const HEALTH: &str = "/health";
pub const DEVICE_ITEM: &str = "/device/{name}";
pub const DOCS: &str = "/docs";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";

/// Build the application router
///
/// Only GET and POST are served on device paths; HEAD is registered explicitly
/// so it is rejected instead of being answered by the GET handler. Every
/// response leaving the router, including 404s for unmatched paths, has its
/// caching headers overwritten with no-cache values.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new(DOCS).url(OPENAPI_JSON, ApiDoc::openapi()))
        .route(HEALTH, get(health_handler))
        .route(
            DEVICE_ITEM,
            get(read_device)
                .post(write_device)
                .head(reject_method)
                .fallback(reject_method),
        )
        .fallback(not_found_handler)
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            PRAGMA,
            HeaderValue::from_static(PRAGMA_NO_CACHE),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
