//! Document schemas for Signet collections

pub mod case;
pub mod metadata;
pub mod signature_token;
pub mod signed_document;

pub use case::{CaseDoc, CASE_COLLECTION};
pub use metadata::Metadata;
pub use signature_token::{
    DocumentType, SignatureTokenDoc, TokenStatus, SIGNATURE_TOKEN_COLLECTION,
};
pub use signed_document::{
    EncryptionMetadata, SignedDocumentDoc, SIGNED_DOCUMENT_COLLECTION,
};
