//! Signet - signature-token service for claim document signing
//!
//! Signet issues time-boxed bearer tokens that gate access to a
//! document-signing flow for motorcycle-rental "not-at-fault" claim cases.
//! A case workflow creates a token, the hirer opens the prefilled link,
//! autosaves drafts, and submits the signed form; the signed PDF is
//! encrypted at rest and served back only to the owning case.
//!
//! ## Services
//!
//! - **Tokens**: issuance, validation, draft saves, and finalization
//! - **Vault**: encrypted storage and ownership-checked retrieval of signed PDFs
//! - **Notify**: best-effort completion emails via an HTTP email API

pub mod config;
pub mod db;
pub mod notify;
pub mod routes;
pub mod server;
pub mod tokens;
pub mod types;
pub mod vault;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, SignetError};
