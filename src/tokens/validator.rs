//! Token validation
//!
//! Separates "exists" from "usable": a completed or expired token is
//! still reported `is_valid` so the client can show "this link has
//! expired" rather than a generic failure, while a token that never
//! existed gets the tampered-or-nonexistent error.

use bson::DateTime;
use serde::Serialize;

use crate::db::schemas::{DocumentType, SignatureTokenDoc};
use crate::tokens::TokenStore;
use crate::types::{Result, SignetError};

/// Outcome of validating a token string
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenValidation {
    pub is_valid: bool,
    pub is_expired: bool,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Classify a fetched token at `now`.
///
/// Pure over its inputs so the expiry boundary is unit-testable:
/// - absent: invalid, "tampered or nonexistent"
/// - completed: valid + completed, regardless of expiry
/// - past TTL: valid + expired, details withheld
/// - live: full details including the prefilled link
pub fn classify(token: Option<&SignatureTokenDoc>, now: DateTime) -> TokenValidation {
    let Some(doc) = token else {
        return TokenValidation {
            is_valid: false,
            is_expired: false,
            is_completed: false,
            case_number: None,
            document_type: None,
            form_link: None,
            error: Some("Invalid signing link: token is tampered or nonexistent".into()),
        };
    };

    if doc.is_completed() {
        return TokenValidation {
            is_valid: true,
            is_expired: false,
            is_completed: true,
            case_number: Some(doc.case_id.clone()),
            document_type: Some(doc.document_type),
            form_link: None,
            error: None,
        };
    }

    if doc.is_expired(now) {
        return TokenValidation {
            is_valid: true,
            is_expired: true,
            is_completed: false,
            case_number: None,
            document_type: Some(doc.document_type),
            form_link: None,
            error: Some("This signing link has expired".into()),
        };
    }

    TokenValidation {
        is_valid: true,
        is_expired: false,
        is_completed: false,
        case_number: Some(doc.case_id.clone()),
        document_type: Some(doc.document_type),
        form_link: Some(doc.form_link.clone()),
        error: None,
    }
}

/// Gate a mutation: `NotFound` if absent, `AlreadyCompleted` if
/// finalized, `Expired` if past TTL. Draft saves and submissions share
/// this check.
pub fn ensure_usable(token: Option<&SignatureTokenDoc>, now: DateTime) -> Result<()> {
    let doc = token.ok_or_else(|| SignetError::NotFound("Unknown token".into()))?;

    if doc.is_completed() {
        return Err(SignetError::AlreadyCompleted(format!(
            "Token for case {} is already completed",
            doc.case_id
        )));
    }

    if doc.is_expired(now) {
        return Err(SignetError::Expired("Signing link has expired".into()));
    }

    Ok(())
}

/// Validation over the persistent store
#[derive(Clone)]
pub struct TokenValidator {
    store: TokenStore,
}

impl TokenValidator {
    pub fn new(store: TokenStore) -> Self {
        Self { store }
    }

    /// Fetch and classify a token at the current instant
    pub async fn validate(&self, token: &str) -> Result<TokenValidation> {
        let doc = self.store.get_by_token(token).await?;
        Ok(classify(doc.as_ref(), DateTime::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::TokenStatus as S;

    fn token_at(status: S, expires_ms: i64) -> SignatureTokenDoc {
        SignatureTokenDoc {
            token: "t".into(),
            case_id: "CASE-2025-001".into(),
            document_type: DocumentType::ClaimsForm,
            status,
            form_link: "http://localhost:8080/forms/claims-form/t".into(),
            created_at: DateTime::from_millis(0),
            expires_at: DateTime::from_millis(expires_ms),
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_token_is_invalid() {
        let v = classify(None, DateTime::from_millis(1000));
        assert!(!v.is_valid);
        assert!(!v.is_expired);
        assert!(v.error.unwrap().contains("tampered or nonexistent"));
    }

    #[test]
    fn test_live_token_returns_full_details() {
        let doc = token_at(S::Pending, 10_000);
        let v = classify(Some(&doc), DateTime::from_millis(1000));
        assert!(v.is_valid && !v.is_expired && !v.is_completed);
        assert_eq!(v.case_number.as_deref(), Some("CASE-2025-001"));
        assert_eq!(v.form_link.as_deref(), Some(doc.form_link.as_str()));
    }

    #[test]
    fn test_expired_token_still_exists() {
        let doc = token_at(S::Draft, 10_000);
        let v = classify(Some(&doc), DateTime::from_millis(20_000));
        assert!(v.is_valid);
        assert!(v.is_expired);
        assert!(!v.is_completed);
        assert!(v.form_link.is_none());
    }

    #[test]
    fn test_expiry_boundary_counts_as_expired() {
        let doc = token_at(S::Pending, 10_000);
        let v = classify(Some(&doc), DateTime::from_millis(10_000));
        assert!(v.is_expired);
    }

    #[test]
    fn test_completed_token_reported_even_after_expiry() {
        let doc = token_at(S::Completed, 10_000);
        let v = classify(Some(&doc), DateTime::from_millis(99_000));
        assert!(v.is_valid);
        assert!(v.is_completed);
        assert!(!v.is_expired);
    }

    #[test]
    fn test_ensure_usable_gates() {
        let now = DateTime::from_millis(5_000);

        assert!(matches!(
            ensure_usable(None, now),
            Err(SignetError::NotFound(_))
        ));

        let completed = token_at(S::Completed, 10_000);
        assert!(matches!(
            ensure_usable(Some(&completed), now),
            Err(SignetError::AlreadyCompleted(_))
        ));

        let expired = token_at(S::Draft, 1_000);
        assert!(matches!(
            ensure_usable(Some(&expired), now),
            Err(SignetError::Expired(_))
        ));

        let live = token_at(S::Pending, 10_000);
        assert!(ensure_usable(Some(&live), now).is_ok());
    }

    #[test]
    fn test_validation_wire_field_names() {
        let doc = token_at(S::Pending, 10_000);
        let v = classify(Some(&doc), DateTime::from_millis(1000));
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["isValid"], true);
        assert_eq!(json["isExpired"], false);
        assert_eq!(json["isCompleted"], false);
        assert_eq!(json["caseNumber"], "CASE-2025-001");
        assert_eq!(json["documentType"], "claims-form");
        assert!(json.get("error").is_none());
    }
}
