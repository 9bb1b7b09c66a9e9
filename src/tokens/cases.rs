//! Read-only access to claim cases
//!
//! The case workflow lives upstream; Signet only resolves display and
//! contact fields from it.

use bson::doc;

use crate::db::schemas::{CaseDoc, CASE_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::Result;

/// Read-only case lookups
#[derive(Clone)]
pub struct CaseStore {
    collection: MongoCollection<CaseDoc>,
}

impl CaseStore {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let collection = mongo.collection::<CaseDoc>(CASE_COLLECTION).await?;
        Ok(Self { collection })
    }

    /// Look up a case by its human-facing number
    pub async fn get_by_number(&self, case_number: &str) -> Result<Option<CaseDoc>> {
        self.collection
            .find_one(doc! { "case_number": case_number })
            .await
    }
}
