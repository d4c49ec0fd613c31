//! Extraction and validation of the IPv4 literal carried by a write.

use axum::{
    body::{Body, Bytes},
    extract::{Form, FromRequest, Request},
    http::{header::CONTENT_TYPE, HeaderValue, Method},
};
use serde::Deserialize;

#[derive(Deserialize)]
struct IpForm {
    ip: Option<String>,
}

/// Pick the raw address text out of a write body
///
/// A form-encoded body with a non-empty `ip` field wins; anything else falls
/// back to the body as text.
pub async fn extract_input(content_type: Option<&HeaderValue>, body: Bytes) -> String {
    if let Some(content_type) = content_type {
        if let Some(ip) = form_field(content_type, body.clone()).await {
            return ip;
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

async fn form_field(content_type: &HeaderValue, body: Bytes) -> Option<String> {
    let request = Request::builder()
        .method(Method::POST)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .ok()?;

    let Form(form) = Form::<IpForm>::from_request(request, &()).await.ok()?;
    form.ip.filter(|ip| !ip.is_empty())
}

/// Normalize and validate an IPv4 literal
///
/// Every character that is not an ASCII digit or `.` is stripped first. The
/// result must then have exactly four dot-separated, non-empty, all-digit
/// octets, each no greater than 255. Returns the normalized string.
pub fn parse_address(raw: &str) -> Option<String> {
    let normalized: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let octets: Vec<&str> = normalized.split('.').collect();
    if octets.len() == 4 && octets.iter().all(|octet| is_octet(octet)) {
        Some(normalized)
    } else {
        None
    }
}

fn is_octet(part: &str) -> bool {
    // bails out as soon as the running value passes 255, so zero padding of any length is fine
    !part.is_empty()
        && part.bytes().all(|b| b.is_ascii_digit())
        && part
            .bytes()
            .try_fold(0u32, |value, b| {
                let value = value * 10 + u32::from(b - b'0');
                (value <= 255).then_some(value)
            })
            .is_some()
}
