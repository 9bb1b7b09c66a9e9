//! Signing-form routes
//!
//! The signer-facing surface: token validation, first-open marking,
//! draft autosaves, and final submission. All bodies are JSON; the
//! signed PDF rides base64 inside the submit payload.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bson::Document;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::db::schemas::{DocumentType, TokenStatus};
use crate::routes::{error_response, json_response, parse_json_body, BoxBody, ErrorResponse};
use crate::server::AppState;
use crate::types::SignetError;

/// Cap for the JSON-only form endpoints
const FORM_BODY_LIMIT: usize = 64 * 1024;

/// Cap for the submit payload, which carries the rendered PDF
const SUBMIT_BODY_LIMIT: usize = 20 * 1024 * 1024;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAccessedResponse {
    pub case_number: String,
    pub document_type: DocumentType,
    pub status: TokenStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    pub form_data: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub success: bool,
    pub last_saved_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub form_data: serde_json::Value,
    /// Rendered, signed PDF, base64 encoded
    pub signed_pdf: String,
    /// Signature image captured in the browser, kept with the form data
    #[serde(default)]
    pub signature_image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub pdf_url: String,
    pub case_id: String,
}

// =============================================================================
// Route matching
// =============================================================================

/// Action segment of a form route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    Draft,
    Submit,
}

/// Match `/forms/{docType}/{token}/{draft|submit}`
pub fn match_form_route(path: &str) -> Option<(&str, &str, FormAction)> {
    let rest = path.strip_prefix("/forms/")?;
    let mut parts = rest.split('/');

    let doc_type = parts.next().filter(|s| !s.is_empty())?;
    let token = parts.next().filter(|s| !s.is_empty())?;
    let action = match parts.next()? {
        "draft" => FormAction::Draft,
        "submit" => FormAction::Submit,
        _ => return None,
    };

    if parts.next().is_some() {
        return None;
    }

    Some((doc_type, token, action))
}

fn json_object_to_bson(value: &serde_json::Value) -> Result<Document, SignetError> {
    if !value.is_object() {
        return Err(SignetError::Validation("formData must be an object".into()));
    }
    bson::to_document(value)
        .map_err(|e| SignetError::Validation(format!("Invalid formData: {}", e)))
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /validate-token
///
/// Classifies a token: nonexistent, completed, expired, or live with the
/// prefilled link. Always 200 with the classification body; clients
/// branch on `isValid` / `isExpired` / `isCompleted`.
pub async fn handle_validate_token(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: TokenRequest = match parse_json_body(req, FORM_BODY_LIMIT).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    match state.validator.validate(&body.token).await {
        Ok(validation) => json_response(StatusCode::OK, &validation),
        Err(e) => error_response(e),
    }
}

/// POST /mark-accessed
///
/// Stamps the first time a signer opened the link. 400 on unknown token.
pub async fn handle_mark_accessed(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: TokenRequest = match parse_json_body(req, FORM_BODY_LIMIT).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let doc = match state.tokens.get_by_token(&body.token).await {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: "Invalid token".into(),
                    code: Some("NOT_FOUND".into()),
                },
            )
        }
        Err(e) => return error_response(e),
    };

    // Only the first open sets the stamp; later opens are no-ops
    if doc.accessed_at.is_none() {
        if let Err(e) = state.tokens.mark_accessed(&body.token).await {
            return error_response(e);
        }
    }

    json_response(
        StatusCode::OK,
        &MarkAccessedResponse {
            case_number: doc.case_id,
            document_type: doc.document_type,
            status: doc.status,
        },
    )
}

/// POST /forms/{docType}/{token}/draft
///
/// Overwrites the saved form data wholesale. 404 missing token, 410
/// expired, 409 already completed.
pub async fn handle_draft(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    doc_type: &str,
    token: &str,
) -> Response<BoxBody> {
    let Ok(expected_type) = DocumentType::from_str(doc_type) else {
        return error_response(SignetError::NotFound(format!(
            "Unknown document type: {}",
            doc_type
        )));
    };

    let body: DraftRequest = match parse_json_body(req, FORM_BODY_LIMIT).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let form_data = match json_object_to_bson(&body.form_data) {
        Ok(d) => d,
        Err(e) => return error_response(e),
    };

    let doc = match state.tokens.get_by_token(token).await {
        Ok(d) => d,
        Err(e) => return error_response(e),
    };

    if let Some(ref d) = doc {
        if d.document_type != expected_type {
            return error_response(SignetError::NotFound("Unknown token".into()));
        }
    }

    if let Err(e) = crate::tokens::validator::ensure_usable(doc.as_ref(), bson::DateTime::now()) {
        return error_response(e);
    }

    match state.tokens.update_form_data(token, form_data).await {
        Ok(Some(updated)) => {
            let last_saved_at = updated
                .metadata
                .updated_at
                .unwrap_or_else(bson::DateTime::now)
                .try_to_rfc3339_string()
                .unwrap_or_default();
            json_response(
                StatusCode::OK,
                &DraftResponse {
                    success: true,
                    last_saved_at,
                },
            )
        }
        // The guard failed between the gate and the write: a concurrent
        // submission completed the token. Stored form data is untouched.
        Ok(None) => error_response(SignetError::AlreadyCompleted(
            "Token was completed while saving the draft".into(),
        )),
        Err(e) => error_response(e),
    }
}

/// POST /forms/{docType}/{token}/submit
///
/// Finalizes the form: persists the encrypted artifact, completes the
/// token, and queues the completion email. 400 on missing parts, 404/410
/// on invalid/expired token, 409 when already completed.
pub async fn handle_submit(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    doc_type: &str,
    token: &str,
) -> Response<BoxBody> {
    let Ok(expected_type) = DocumentType::from_str(doc_type) else {
        return error_response(SignetError::NotFound(format!(
            "Unknown document type: {}",
            doc_type
        )));
    };

    let body: SubmitRequest = match parse_json_body(req, SUBMIT_BODY_LIMIT).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let mut form_data = match json_object_to_bson(&body.form_data) {
        Ok(d) => d,
        Err(e) => return error_response(e),
    };
    if let Some(signature) = body.signature_image {
        form_data.insert("signatureImage", signature);
    }

    let signed_pdf = match BASE64.decode(body.signed_pdf.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => {
            return error_response(SignetError::Validation(
                "signedPdf is not valid base64".into(),
            ))
        }
    };

    match state
        .finalizer
        .submit(token, expected_type, form_data, signed_pdf)
        .await
    {
        Ok(outcome) => json_response(
            StatusCode::OK,
            &SubmitResponse {
                success: true,
                pdf_url: outcome.pdf_url,
                case_id: outcome.case_id,
            },
        ),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_route_matching() {
        assert_eq!(
            match_form_route("/forms/claims-form/abc123/draft"),
            Some(("claims-form", "abc123", FormAction::Draft))
        );
        assert_eq!(
            match_form_route("/forms/rental-agreement/tok/submit"),
            Some(("rental-agreement", "tok", FormAction::Submit))
        );
    }

    #[test]
    fn test_form_route_rejects_malformed_paths() {
        assert!(match_form_route("/forms/claims-form/abc123").is_none());
        assert!(match_form_route("/forms/claims-form//draft").is_none());
        assert!(match_form_route("/forms/claims-form/abc/finalize").is_none());
        assert!(match_form_route("/forms/claims-form/abc/draft/extra").is_none());
        assert!(match_form_route("/other/claims-form/abc/draft").is_none());
    }

    #[test]
    fn test_form_data_must_be_object() {
        assert!(json_object_to_bson(&serde_json::json!({"firstName": "Jane"})).is_ok());
        assert!(json_object_to_bson(&serde_json::json!(["a", "b"])).is_err());
        assert!(json_object_to_bson(&serde_json::json!("text")).is_err());
    }

    #[test]
    fn test_submit_response_wire_fields() {
        let resp = SubmitResponse {
            success: true,
            pdf_url: "http://x/documents/CASE-1/abc".into(),
            case_id: "CASE-1".into(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["pdfUrl"], "http://x/documents/CASE-1/abc");
        assert_eq!(json["caseId"], "CASE-1");
    }

    #[test]
    fn test_draft_response_wire_fields() {
        let resp = DraftResponse {
            success: true,
            last_saved_at: "2025-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["lastSavedAt"], "2025-01-01T00:00:00Z");
    }
}
