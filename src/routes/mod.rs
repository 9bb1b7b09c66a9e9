//! HTTP routes for Signet

pub mod admin;
pub mod documents;
pub mod forms;
pub mod health;

pub use admin::{handle_delete_case_tokens, handle_issue_token};
pub use documents::handle_get_document;
pub use forms::{
    handle_draft, handle_mark_accessed, handle_submit, handle_validate_token, match_form_route,
    FormAction,
};
pub use health::{health_check, readiness_check, version_info};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::server::AppState;
use crate::types::SignetError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Structured error body, stable across all endpoints
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization, X-Api-Key")
        .body(full_body(json))
        .unwrap()
}

/// Map an error to its HTTP response.
///
/// Expected client conditions keep their message; server faults are
/// logged with full context and surfaced as a generic body.
pub fn error_response(err: SignetError) -> Response<BoxBody> {
    let status = err.status_code();
    let code = err.code();

    let message = if err.is_client_error() {
        err.to_string()
    } else {
        error!("Request failed: {}", err);
        "Internal server error".to_string()
    };

    json_response(
        status,
        &ErrorResponse {
            error: message,
            code: Some(code.to_string()),
        },
    )
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("No route for {}", path),
            code: Some("NOT_FOUND".into()),
        },
    )
}

pub fn preflight_response() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization, X-Api-Key")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

/// Declared request size from Content-Length, when present and parseable
fn declared_body_length(headers: &hyper::HeaderMap) -> Option<usize> {
    headers
        .get(hyper::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Read and deserialize a JSON body, bounded by `max_bytes`.
///
/// An honest Content-Length over the limit is rejected before any body
/// bytes are buffered; the post-read check still covers requests that
/// omit or understate it.
pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
    max_bytes: usize,
) -> Result<T, SignetError> {
    if declared_body_length(req.headers()).is_some_and(|len| len > max_bytes) {
        return Err(SignetError::Validation("Request body too large".into()));
    }

    let body = req
        .collect()
        .await
        .map_err(|e| SignetError::Validation(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > max_bytes {
        return Err(SignetError::Validation("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| SignetError::Validation(format!("Invalid JSON: {}", e)))
}

/// Check the caller's API key for the privileged endpoints (token
/// issuance, document retrieval, case deletion).
pub fn require_api_key(
    state: &AppState,
    req: &Request<hyper::body::Incoming>,
) -> Result<(), SignetError> {
    let Some(ref expected) = state.args.api_key else {
        // validate() guarantees a key outside dev mode
        return Ok(());
    };

    let bearer = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let header_key = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());

    match bearer.or(header_key) {
        Some(provided) if provided == expected => Ok(()),
        _ => Err(SignetError::AccessDenied("Missing or invalid API key".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_body_length_parsing() {
        let mut headers = hyper::HeaderMap::new();
        assert_eq!(declared_body_length(&headers), None);

        headers.insert(hyper::header::CONTENT_LENGTH, "123".parse().unwrap());
        assert_eq!(declared_body_length(&headers), Some(123));

        headers.insert(hyper::header::CONTENT_LENGTH, "not-a-number".parse().unwrap());
        assert_eq!(declared_body_length(&headers), None);
    }

    #[test]
    fn test_declared_length_against_limit() {
        let mut headers = hyper::HeaderMap::new();
        headers.insert(hyper::header::CONTENT_LENGTH, "2048".parse().unwrap());

        let declared = declared_body_length(&headers);
        assert!(declared.is_some_and(|len| len > 1024));
        assert!(!declared.is_some_and(|len| len > 4096));
    }
}
