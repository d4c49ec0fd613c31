use axum::{
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

pub const NO_CACHE: &str = "no-store, no-cache, must-revalidate";
pub const PRAGMA_NO_CACHE: &str = "no-cache";
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Error type shared by the router and the per-device stores
///
/// Every variant maps to a distinct status code and a short plain-text body,
/// so callers can branch on the response without parsing anything.
#[derive(Debug)]
pub enum ApiError {
    /// Path did not match `/device/<name>`
    RouteNotFound,
    /// Method other than GET or POST
    MethodNotAllowed,
    /// Missing or mismatched bearer token on a write
    Unauthorized,
    /// Body did not contain a valid IPv4 address
    InvalidInput,
    /// Device name is valid but nothing has been stored yet
    NotSet,
    /// Storage backend failure
    Storage(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidInput => StatusCode::BAD_REQUEST,
            ApiError::NotSet => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ApiError::RouteNotFound => "not found",
            ApiError::MethodNotAllowed => "method not allowed",
            ApiError::Unauthorized => "unauthorized",
            ApiError::InvalidInput => "bad ip",
            ApiError::NotSet => "not set",
            ApiError::Storage(_) => "storage error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(err) = &self {
            tracing::error!("Storage backend error: {:#}", err);
        }
        plain_text(self.status(), self.message())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Storage(err)
    }
}

/// Overwrite any caching headers with values that disable caching entirely
pub fn stamp_no_cache(headers: &mut HeaderMap) {
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    headers.insert(PRAGMA, HeaderValue::from_static(PRAGMA_NO_CACHE));
}

/// Plain-text response carrying the no-cache headers
pub fn plain_text(status: StatusCode, body: impl Into<String>) -> Response {
    let mut response = (status, body.into()).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8));
    stamp_no_cache(headers);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_error_has_distinct_status_and_body() {
        let errors = [
            ApiError::RouteNotFound,
            ApiError::MethodNotAllowed,
            ApiError::Unauthorized,
            ApiError::InvalidInput,
            ApiError::NotSet,
            ApiError::Storage(anyhow::anyhow!("boom")),
        ];

        let pairs: Vec<(StatusCode, &str)> =
            errors.iter().map(|e| (e.status(), e.message())).collect();

        for (i, a) in pairs.iter().enumerate() {
            for b in pairs.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[tokio::test]
    async fn test_error_response_is_plain_text_and_uncached() {
        let response = ApiError::InvalidInput.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], TEXT_PLAIN_UTF8);
        assert_eq!(response.headers()[CACHE_CONTROL], NO_CACHE);
        assert_eq!(response.headers()[PRAGMA], PRAGMA_NO_CACHE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"bad ip");
    }

    #[test]
    fn test_stamp_no_cache_overwrites_existing_values() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=3600"));
        headers.append(PRAGMA, HeaderValue::from_static("public"));

        stamp_no_cache(&mut headers);

        assert_eq!(headers.get_all(CACHE_CONTROL).iter().count(), 1);
        assert_eq!(headers[CACHE_CONTROL], NO_CACHE);
        assert_eq!(headers[PRAGMA], PRAGMA_NO_CACHE);
    }
}
