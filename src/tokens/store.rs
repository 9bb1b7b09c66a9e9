//! Persistence for signature tokens
//!
//! Every read goes to the store; there is no caching layer. Mutations
//! that must never touch a completed token use `find_one_and_update`
//! with a `status != completed` filter, which makes the update a
//! compare-and-set: the losing side of a same-token race observes `None`
//! instead of overwriting the winner.

use bson::{doc, DateTime, Document};
use chrono::Duration;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::db::schemas::{
    DocumentType, SignatureTokenDoc, TokenStatus, SIGNATURE_TOKEN_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::Result;

/// Random bytes per token string (hex doubles the length on the wire)
const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically unpredictable token string
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Build the prefilled URL shared with the signer
pub fn build_form_link(public_url: &str, document_type: DocumentType, token: &str) -> String {
    format!(
        "{}/forms/{}/{}",
        public_url.trim_end_matches('/'),
        document_type,
        token
    )
}

/// Token persistence over MongoDB
#[derive(Clone)]
pub struct TokenStore {
    collection: MongoCollection<SignatureTokenDoc>,
    public_url: String,
}

impl TokenStore {
    pub async fn new(mongo: &MongoClient, public_url: String) -> Result<Self> {
        let collection = mongo
            .collection::<SignatureTokenDoc>(SIGNATURE_TOKEN_COLLECTION)
            .await?;
        Ok(Self {
            collection,
            public_url,
        })
    }

    /// Issue a new pending token for a case.
    ///
    /// `expires_at` is fixed here and never extended.
    pub async fn create(
        &self,
        case_id: &str,
        document_type: DocumentType,
        form_data: Document,
        ttl: Duration,
    ) -> Result<SignatureTokenDoc> {
        let token = generate_token();
        let now = DateTime::now();
        let expires_at = DateTime::from_millis(now.timestamp_millis() + ttl.num_milliseconds());

        let doc = SignatureTokenDoc {
            _id: None,
            metadata: Default::default(),
            token: token.clone(),
            case_id: case_id.to_string(),
            document_type,
            status: TokenStatus::Pending,
            form_data,
            form_link: build_form_link(&self.public_url, document_type, &token),
            created_at: now,
            expires_at,
            accessed_at: None,
            completed_at: None,
            pdf_url: None,
        };

        let id = self.collection.insert_one(doc.clone()).await?;
        Ok(SignatureTokenDoc {
            _id: Some(id),
            ..doc
        })
    }

    /// Fetch a token by its bearer string
    pub async fn get_by_token(&self, token: &str) -> Result<Option<SignatureTokenDoc>> {
        self.collection.find_one(doc! { "token": token }).await
    }

    /// Overwrite the draft form data wholesale, promoting `Pending` to
    /// `Draft`. Guarded against completed tokens; last write wins between
    /// concurrent autosaves.
    ///
    /// Returns the updated token, or `None` if it is absent or completed.
    pub async fn update_form_data(
        &self,
        token: &str,
        form_data: Document,
    ) -> Result<Option<SignatureTokenDoc>> {
        self.collection
            .find_one_and_update(
                doc! {
                    "token": token,
                    "status": { "$ne": TokenStatus::Completed.as_str() },
                },
                doc! {
                    "$set": {
                        "form_data": form_data,
                        "status": TokenStatus::Draft.as_str(),
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    /// Finalize a token: one atomic update sets status, completion
    /// timestamp, artifact URL, and final form data together.
    ///
    /// `None` means the guard failed — the token is absent or some other
    /// submission already completed it.
    pub async fn complete(
        &self,
        token: &str,
        form_data: Document,
        pdf_url: &str,
        completed_at: DateTime,
    ) -> Result<Option<SignatureTokenDoc>> {
        self.collection
            .find_one_and_update(
                doc! {
                    "token": token,
                    "status": { "$ne": TokenStatus::Completed.as_str() },
                },
                doc! {
                    "$set": {
                        "status": TokenStatus::Completed.as_str(),
                        "completed_at": completed_at,
                        "pdf_url": pdf_url,
                        "form_data": form_data,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    /// Stamp the first time the signer opened the link
    pub async fn mark_accessed(&self, token: &str) -> Result<Option<SignatureTokenDoc>> {
        self.collection
            .find_one_and_update(
                doc! { "token": token, "accessed_at": { "$exists": false } },
                doc! { "$set": { "accessed_at": DateTime::now() } },
            )
            .await
    }

    /// Soft-delete all tokens of a case, returning how many were removed.
    /// Called from whole-case deletion in the upstream workflow.
    pub async fn delete_by_case(&self, case_id: &str) -> Result<u64> {
        self.collection
            .soft_delete_many(doc! { "case_id": case_id })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_long_hex() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_form_link_layout() {
        let link = build_form_link(
            "https://claims.example.com/",
            DocumentType::ClaimsForm,
            "abc123",
        );
        assert_eq!(link, "https://claims.example.com/forms/claims-form/abc123");
    }
}
