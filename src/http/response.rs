//! Downstream response construction.
//!
//! # Responsibilities
//! - Relay a buffered upstream body with the status chosen by JSON validity
//! - Build the empty 500 used when a request fails before or during transport
//!
//! # Design Decisions
//! - The upstream status is never relayed: valid JSON → 200, anything else → 500
//! - The accumulated body is returned verbatim, never re-serialized

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

use crate::error::ProxyError;

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";
pub const HTML_CONTENT_TYPE: &str = "text/html;charset=utf-8";

/// Take a prepared set of downstream parts and finish it as a JSON relay.
pub fn json_response(mut parts: axum::http::response::Parts, body: Bytes) -> Response {
    parts.status = StatusCode::OK;
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    Response::from_parts(parts, Body::from(body))
}

/// Relay an upstream body that failed validation, with a 500.
pub fn invalid_body_response(body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    response
}

/// Empty-bodied response for a request that could not be forwarded.
pub fn error_response(err: &ProxyError) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = err.status_code();
    response
}
