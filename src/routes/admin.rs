//! Case-system endpoints
//!
//! Called by the claims workflow, not by signers: token issuance and
//! whole-case token cleanup. Both require the API key.

use bson::Document;
use chrono::Duration;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{DocumentType, TokenStatus};
use crate::routes::{
    error_response, json_response, parse_json_body, require_api_key, BoxBody,
};
use crate::server::AppState;
use crate::types::SignetError;

const ADMIN_BODY_LIMIT: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenRequest {
    pub case_number: String,
    pub document_type: String,
    /// Prefill values carried into the form
    #[serde(default)]
    pub form_data: Option<serde_json::Value>,
    /// Override of the configured TTL, in hours
    #[serde(default)]
    pub ttl_hours: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenResponse {
    pub token: String,
    pub form_link: String,
    pub case_number: String,
    pub document_type: DocumentType,
    pub status: TokenStatus,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTokensResponse {
    pub case_number: String,
    pub tokens_deleted: u64,
    pub documents_deleted: u64,
}

/// POST /api/v1/tokens
///
/// Issue a signing token for an existing case. The expiry is fixed here
/// and never extended later.
pub async fn handle_issue_token(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    if let Err(e) = require_api_key(&state, &req) {
        return error_response(e);
    }

    let body: IssueTokenRequest = match parse_json_body(req, ADMIN_BODY_LIMIT).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let Ok(document_type) = DocumentType::from_str(&body.document_type) else {
        return error_response(SignetError::Validation(format!(
            "Unknown document type: {}",
            body.document_type
        )));
    };

    let ttl_hours = body.ttl_hours.unwrap_or(state.args.token_ttl_hours);
    if ttl_hours <= 0 {
        return error_response(SignetError::Validation("ttlHours must be positive".into()));
    }

    // The case must exist before a link goes out for it
    match state.cases.get_by_number(&body.case_number).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(SignetError::NotFound(format!(
                "No case {}",
                body.case_number
            )))
        }
        Err(e) => return error_response(e),
    }

    let form_data: Document = match body.form_data {
        Some(ref value) if value.is_object() => match bson::to_document(value) {
            Ok(d) => d,
            Err(e) => {
                return error_response(SignetError::Validation(format!(
                    "Invalid formData: {}",
                    e
                )))
            }
        },
        Some(_) => {
            return error_response(SignetError::Validation("formData must be an object".into()))
        }
        None => Document::new(),
    };

    match state
        .tokens
        .create(
            &body.case_number,
            document_type,
            form_data,
            Duration::hours(ttl_hours),
        )
        .await
    {
        Ok(token) => {
            info!(
                "Issued {} token for case {} (expires {})",
                document_type,
                body.case_number,
                token
                    .expires_at
                    .try_to_rfc3339_string()
                    .unwrap_or_default()
            );
            json_response(
                StatusCode::CREATED,
                &IssueTokenResponse {
                    token: token.token,
                    form_link: token.form_link,
                    case_number: token.case_id,
                    document_type: token.document_type,
                    status: token.status,
                    expires_at: token
                        .expires_at
                        .try_to_rfc3339_string()
                        .unwrap_or_default(),
                },
            )
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/cases/{caseNumber}/tokens
///
/// Whole-case cleanup hook for the case system: soft-deletes every token
/// and signed-document record of the case.
pub async fn handle_delete_case_tokens(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    case_number: &str,
) -> Response<BoxBody> {
    if let Err(e) = require_api_key(&state, &req) {
        return error_response(e);
    }

    let tokens_deleted = match state.tokens.delete_by_case(case_number).await {
        Ok(n) => n,
        Err(e) => return error_response(e),
    };
    let documents_deleted = match state.vault.delete_by_case(case_number).await {
        Ok(n) => n,
        Err(e) => return error_response(e),
    };

    info!(
        "Deleted {} tokens and {} document records for case {}",
        tokens_deleted, documents_deleted, case_number
    );

    json_response(
        StatusCode::OK,
        &DeleteTokensResponse {
            case_number: case_number.to_string(),
            tokens_deleted,
            documents_deleted,
        },
    )
}
