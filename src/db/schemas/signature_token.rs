//! Signature token schema
//!
//! A token is the bearer credential embedded in a signing link. It is
//! usable while `now < expires_at` and the status has not reached
//! `Completed`; once completed it is permanently read-only.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for signature tokens
pub const SIGNATURE_TOKEN_COLLECTION: &str = "signature_tokens";

/// Lifecycle state of a signature token.
///
/// Transitions are one-directional: `Pending -> Draft -> Completed`, or
/// `Pending -> Completed` directly. Never backward.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    #[default]
    Pending,
    Draft,
    Completed,
}

impl TokenStatus {
    /// Whether moving to `next` is a legal forward transition
    pub fn can_transition_to(self, next: TokenStatus) -> bool {
        matches!(
            (self, next),
            (TokenStatus::Pending, TokenStatus::Draft)
                | (TokenStatus::Pending, TokenStatus::Completed)
                | (TokenStatus::Draft, TokenStatus::Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Pending => "pending",
            TokenStatus::Draft => "draft",
            TokenStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of document being signed
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DocumentType {
    #[default]
    #[serde(rename = "claims-form")]
    ClaimsForm,
    #[serde(rename = "authority-to-act")]
    AuthorityToAct,
    #[serde(rename = "rental-agreement")]
    RentalAgreement,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::ClaimsForm => "claims-form",
            DocumentType::AuthorityToAct => "authority-to-act",
            DocumentType::RentalAgreement => "rental-agreement",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claims-form" => Ok(DocumentType::ClaimsForm),
            "authority-to-act" => Ok(DocumentType::AuthorityToAct),
            "rental-agreement" => Ok(DocumentType::RentalAgreement),
            other => Err(format!("Unknown document type: {}", other)),
        }
    }
}

/// Signature token document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SignatureTokenDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Opaque bearer credential embedded in the signing link
    pub token: String,

    /// Case this token belongs to
    pub case_id: String,

    /// Kind of document being signed
    pub document_type: DocumentType,

    /// Lifecycle state
    #[serde(default)]
    pub status: TokenStatus,

    /// In-progress or final form field values, overwritten wholesale
    #[serde(default)]
    pub form_data: Document,

    /// Prefilled URL shared with the signer
    pub form_link: String,

    /// When the token was issued
    pub created_at: DateTime,

    /// Fixed at creation, never extended
    pub expires_at: DateTime,

    /// First time the signer opened the link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessed_at: Option<DateTime>,

    /// Set only once status reaches completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,

    /// URL of the signed artifact, set only on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

impl Default for SignatureTokenDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            token: String::new(),
            case_id: String::new(),
            document_type: DocumentType::default(),
            status: TokenStatus::default(),
            form_data: Document::new(),
            form_link: String::new(),
            created_at: DateTime::from_millis(0),
            expires_at: DateTime::from_millis(0),
            accessed_at: None,
            completed_at: None,
            pdf_url: None,
        }
    }
}

impl SignatureTokenDoc {
    /// Whether the token is past its TTL at `now`.
    ///
    /// The boundary instant counts as expired: a token is usable only
    /// while `now < expires_at`.
    pub fn is_expired(&self, now: DateTime) -> bool {
        now.timestamp_millis() >= self.expires_at.timestamp_millis()
    }

    /// Whether the token has been finalized
    pub fn is_completed(&self) -> bool {
        self.status == TokenStatus::Completed
    }
}

impl IntoIndexes for SignatureTokenDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the token string
            (
                doc! { "token": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("token_unique".to_string())
                        .build(),
                ),
            ),
            // Index on case_id for per-case listing and deletion
            (
                doc! { "case_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("case_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for SignatureTokenDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(TokenStatus::Pending.can_transition_to(TokenStatus::Draft));
        assert!(TokenStatus::Pending.can_transition_to(TokenStatus::Completed));
        assert!(TokenStatus::Draft.can_transition_to(TokenStatus::Completed));
    }

    #[test]
    fn test_backward_and_self_transitions_rejected() {
        assert!(!TokenStatus::Draft.can_transition_to(TokenStatus::Pending));
        assert!(!TokenStatus::Completed.can_transition_to(TokenStatus::Draft));
        assert!(!TokenStatus::Completed.can_transition_to(TokenStatus::Pending));
        assert!(!TokenStatus::Completed.can_transition_to(TokenStatus::Completed));
        assert!(!TokenStatus::Pending.can_transition_to(TokenStatus::Pending));
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&TokenStatus::Completed).unwrap(),
            "\"completed\""
        );
        let parsed: TokenStatus = serde_json::from_str("\"draft\"").unwrap();
        assert_eq!(parsed, TokenStatus::Draft);
    }

    #[test]
    fn test_document_type_round_trip() {
        for (s, ty) in [
            ("claims-form", DocumentType::ClaimsForm),
            ("authority-to-act", DocumentType::AuthorityToAct),
            ("rental-agreement", DocumentType::RentalAgreement),
        ] {
            assert_eq!(s.parse::<DocumentType>().unwrap(), ty);
            assert_eq!(ty.as_str(), s);
        }
        assert!("waiver".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_expiry_boundary_is_expired() {
        let instant = DateTime::from_millis(1_700_000_000_000);
        let token = SignatureTokenDoc {
            expires_at: instant,
            ..Default::default()
        };

        assert!(!token.is_expired(DateTime::from_millis(1_699_999_999_999)));
        // Exactly at expires_at counts as expired
        assert!(token.is_expired(instant));
        assert!(token.is_expired(DateTime::from_millis(1_700_000_000_001)));
    }
}
