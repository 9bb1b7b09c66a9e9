//! Signed-document persistence and retrieval
//!
//! Ciphertext files live on disk under the storage root; one MongoDB
//! record per file carries the name, plaintext digest, and encryption
//! metadata. Retrieval checks case ownership before any decryption so a
//! guessed document id under the wrong case yields nothing.

use bson::{doc, oid::ObjectId, DateTime};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, warn};

use crate::db::schemas::{
    DocumentType, SignedDocumentDoc, SIGNED_DOCUMENT_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{Result, SignetError};
use crate::vault::DocumentCipher;

/// Result of storing a signed artifact
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub document_id: ObjectId,
    pub pdf_url: String,
    pub file_name: String,
}

/// Decrypted artifact handed back to an authorized caller
#[derive(Debug, Clone)]
pub struct RetrievedDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

/// Strip anything outside `[A-Za-z0-9_-]` so ids can be embedded in file
/// names safely.
fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Artifact name: case id, document type, submission timestamp, and the
/// record's own id. The id is what makes the name unique; two
/// submissions racing on the same token in the same millisecond still
/// write to distinct paths, so the loser's cleanup can never touch the
/// winner's file.
pub fn artifact_file_name(
    case_id: &str,
    document_type: DocumentType,
    signed_at: DateTime,
    document_id: &ObjectId,
) -> String {
    format!(
        "{}-{}-{}-{}.pdf",
        sanitize_component(case_id),
        document_type,
        signed_at.timestamp_millis(),
        document_id.to_hex()
    )
}

/// Hex SHA-256 digest of plaintext content
pub fn content_digest(plaintext: &[u8]) -> String {
    hex::encode(Sha256::digest(plaintext))
}

/// Resolve a record lookup against the requesting case. A record owned
/// by another case is reported exactly like a missing one, so callers
/// cannot probe for document ids across cases.
fn authorize(record: Option<SignedDocumentDoc>, case_id: &str) -> Result<SignedDocumentDoc> {
    match record {
        Some(record) if record.case_id == case_id => Ok(record),
        _ => Err(SignetError::NotFound("No such document".into())),
    }
}

/// Encrypted document store
#[derive(Clone)]
pub struct DocumentVault {
    collection: MongoCollection<SignedDocumentDoc>,
    cipher: Arc<DocumentCipher>,
    storage_root: PathBuf,
    public_url: String,
}

impl DocumentVault {
    pub async fn new(
        mongo: &MongoClient,
        cipher: Arc<DocumentCipher>,
        storage_root: PathBuf,
        public_url: String,
    ) -> Result<Self> {
        let collection = mongo
            .collection::<SignedDocumentDoc>(SIGNED_DOCUMENT_COLLECTION)
            .await?;
        Ok(Self {
            collection,
            cipher,
            storage_root,
            public_url,
        })
    }

    fn ciphertext_path(&self, file_name: &str) -> PathBuf {
        self.storage_root.join(format!("{}.enc", file_name))
    }

    /// Encrypt and persist a signed artifact, returning its id and the
    /// URL it will be served from.
    pub async fn store(
        &self,
        case_id: &str,
        document_type: DocumentType,
        plaintext: &[u8],
        signed_at: DateTime,
    ) -> Result<StoredDocument> {
        // The record id doubles as the uniqueness component of the file
        // name, so it is fixed before anything touches disk.
        let document_id = ObjectId::new();
        let file_name = artifact_file_name(case_id, document_type, signed_at, &document_id);
        let path = self.ciphertext_path(&file_name);

        let sha256 = content_digest(plaintext);
        let (ciphertext, encryption) = self.cipher.encrypt(plaintext)?;

        tokio::fs::create_dir_all(&self.storage_root)
            .await
            .map_err(|e| SignetError::Storage(format!("Cannot create storage root: {}", e)))?;
        tokio::fs::write(&path, &ciphertext)
            .await
            .map_err(|e| SignetError::Storage(format!("Cannot write artifact: {}", e)))?;

        let record = SignedDocumentDoc {
            _id: Some(document_id),
            metadata: Default::default(),
            case_id: case_id.to_string(),
            document_type,
            file_path: path.to_string_lossy().into_owned(),
            file_name: file_name.clone(),
            signed_at,
            sha256,
            encryption,
        };

        match self.collection.insert_one(record).await {
            Ok(_) => {}
            Err(e) => {
                // The record is the source of truth; without it the file
                // is unreachable, so remove it again.
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove orphaned artifact {}: {}", path.display(), rm);
                }
                return Err(e);
            }
        };

        Ok(StoredDocument {
            document_id,
            pdf_url: format!(
                "{}/documents/{}/{}",
                self.public_url.trim_end_matches('/'),
                case_id,
                document_id.to_hex()
            ),
            file_name,
        })
    }

    /// Fetch and decrypt a document for the given case.
    ///
    /// A mismatched case is reported as `NotFound`, the same as a missing
    /// record, so callers cannot probe for document ids across cases.
    pub async fn retrieve(&self, case_id: &str, document_id: &str) -> Result<RetrievedDocument> {
        let oid = ObjectId::parse_str(document_id)
            .map_err(|_| SignetError::NotFound("No such document".into()))?;

        let record = authorize(self.collection.find_one(doc! { "_id": oid }).await?, case_id)?;

        let ciphertext = match tokio::fs::read(Path::new(&record.file_path)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!(
                    "Signed document record {} points at missing file {}",
                    document_id, record.file_path
                );
                return Err(SignetError::NotFound("No such document".into()));
            }
            Err(e) => return Err(SignetError::Storage(format!("Cannot read artifact: {}", e))),
        };

        let plaintext = self.cipher.decrypt(&ciphertext, &record.encryption)?;

        if content_digest(&plaintext) != record.sha256 {
            return Err(SignetError::Storage(format!(
                "Integrity check failed for document {}",
                document_id
            )));
        }

        Ok(RetrievedDocument {
            bytes: plaintext,
            file_name: record.file_name,
        })
    }

    /// Remove a just-stored record and its file after a lost submission
    /// race. Best effort; the winner's artifact is untouched.
    pub async fn discard(&self, stored: &StoredDocument) {
        let path = self.ciphertext_path(&stored.file_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove losing artifact {}: {}", path.display(), e);
        }
        if let Err(e) = self
            .collection
            .soft_delete_many(doc! { "_id": stored.document_id })
            .await
        {
            warn!("Failed to remove losing document record: {}", e);
        }
    }

    /// Soft-delete every document record of a case. File removal is the
    /// whole-case deletion job's responsibility.
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
    fn test_artifact_name_layout() {
        let oid = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let name = artifact_file_name(
            "CASE-2025-001",
            DocumentType::ClaimsForm,
            DateTime::from_millis(1_700_000_000_000),
            &oid,
        );
        assert_eq!(
            name,
            "CASE-2025-001-claims-form-1700000000000-507f1f77bcf86cd799439011.pdf"
        );
    }

    #[test]
    fn test_artifact_name_sanitizes_case_id() {
        let name = artifact_file_name(
            "../..//etc",
            DocumentType::RentalAgreement,
            DateTime::from_millis(0),
            &ObjectId::new(),
        );
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));
        assert!(name.contains("-rental-agreement-0-"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn test_same_millisecond_submissions_get_distinct_paths() {
        // Two submissions stamped in the same millisecond must never
        // share a ciphertext path, or the losing side's cleanup would
        // destroy the winner's artifact.
        let at = DateTime::from_millis(1_700_000_000_000);
        let a = artifact_file_name("C1", DocumentType::ClaimsForm, at, &ObjectId::new());
        let b = artifact_file_name("C1", DocumentType::ClaimsForm, at, &ObjectId::new());
        assert_ne!(a, b);
    }

    #[test]
    fn test_cross_case_lookup_is_not_found() {
        let record = SignedDocumentDoc {
            case_id: "CASE-2025-001".into(),
            ..Default::default()
        };
        let mismatch = authorize(Some(record), "CASE-2025-002").unwrap_err();
        let missing = authorize(None, "CASE-2025-002").unwrap_err();

        assert!(matches!(mismatch, SignetError::NotFound(_)));
        assert!(matches!(missing, SignetError::NotFound(_)));
        // A foreign-owned document must look exactly like a missing one
        assert_eq!(mismatch.to_string(), missing.to_string());
    }

    #[test]
    fn test_owning_case_passes_authorization() {
        let record = SignedDocumentDoc {
            case_id: "CASE-2025-001".into(),
            file_name: "CASE-2025-001-claims-form-0-abc.pdf".into(),
            ..Default::default()
        };
        let resolved = authorize(Some(record), "CASE-2025-001").unwrap();
        assert_eq!(resolved.file_name, "CASE-2025-001-claims-form-0-abc.pdf");
    }

    #[test]
    fn test_content_digest_is_stable_sha256() {
        // sha256("") well-known vector
        assert_eq!(
            content_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(content_digest(b"a"), content_digest(b"b"));
    }
}
