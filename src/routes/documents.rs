//! Signed-document retrieval
//!
//! Serves decrypted PDFs back to the case system. Ownership is checked
//! in the vault: a document id under the wrong case is indistinguishable
//! from a missing one.

use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

use crate::routes::{error_response, full_body, require_api_key, BoxBody};
use crate::server::AppState;

/// GET /documents/{caseId}/{documentId}
///
/// Streams the decrypted PDF. 404 if the document does not exist or
/// belongs to another case; decryption and I/O failures surface as 500.
pub async fn handle_get_document(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    case_id: &str,
    document_id: &str,
) -> Response<BoxBody> {
    if let Err(e) = require_api_key(&state, &req) {
        return error_response(e);
    }

    match state.vault.retrieve(case_id, document_id).await {
        Ok(document) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/pdf")
            .header(
                "Content-Disposition",
                format!("inline; filename=\"{}\"", document.file_name),
            )
            .header("Access-Control-Allow-Origin", "*")
            .body(full_body(document.bytes))
            .unwrap(),
        Err(e) => error_response(e),
    }
}
