//! Signed document schema
//!
//! A record per finalized PDF artifact. Created once by the submission
//! finalizer, never mutated afterward; removed only as part of whole-case
//! deletion.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{DocumentType, Metadata};

/// Collection name for signed documents
pub const SIGNED_DOCUMENT_COLLECTION: &str = "signed_documents";

/// Encryption parameters stored alongside each ciphertext so historical
/// documents remain decryptable after key rotation.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EncryptionMetadata {
    /// Algorithm identifier (e.g. "chacha20poly1305")
    pub algorithm: String,

    /// Per-document nonce, hex encoded
    pub nonce: String,

    /// Version of the key the ciphertext was produced with
    pub key_version: u32,
}

/// Signed document record stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SignedDocumentDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Case that owns this document
    pub case_id: String,

    /// Kind of document that was signed
    pub document_type: DocumentType,

    /// Path of the encrypted artifact on disk
    pub file_path: String,

    /// Original (plaintext) file name
    pub file_name: String,

    /// When the signer submitted
    pub signed_at: DateTime,

    /// SHA-256 digest of the plaintext content, hex encoded
    pub sha256: String,

    /// How the artifact was encrypted at rest
    pub encryption: EncryptionMetadata,
}

impl Default for SignedDocumentDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            case_id: String::new(),
            document_type: DocumentType::default(),
            file_path: String::new(),
            file_name: String::new(),
            signed_at: DateTime::from_millis(0),
            sha256: String::new(),
            encryption: EncryptionMetadata::default(),
        }
    }
}

impl IntoIndexes for SignedDocumentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "case_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("case_id_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for SignedDocumentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
