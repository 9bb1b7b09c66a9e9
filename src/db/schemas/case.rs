//! Case schema
//!
//! Cases are owned by the claims workflow upstream of this service.
//! Signet reads them to prefill signing links and to address completion
//! notifications; it never mutates them.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for cases
pub const CASE_COLLECTION: &str = "cases";

/// Claim case document, read-only from Signet's perspective
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CaseDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Human-facing case number (e.g. "CASE-2025-001")
    pub case_number: String,

    /// Name of the not-at-fault hirer
    pub hirer_name: String,

    /// Email the completion notification goes to
    pub hirer_email: String,

    /// Registration of the rental bike assigned to the case
    #[serde(default)]
    pub registration: Option<String>,

    /// Workflow status maintained by the case system
    #[serde(default)]
    pub status: String,
}

impl IntoIndexes for CaseDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "case_number": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("case_number_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for CaseDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
