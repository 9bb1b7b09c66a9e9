//! Signature-token lifecycle
//!
//! Issuance, validation, draft saves, and finalization of signing tokens.
//! The lifecycle is a small forward-only state machine over
//! [`TokenStatus`](crate::db::schemas::TokenStatus); every mutation that
//! must not touch a completed token goes through an atomic conditional
//! update so concurrent submissions have exactly one winner.

pub mod cases;
pub mod finalizer;
pub mod store;
pub mod validator;

pub use cases::CaseStore;
pub use finalizer::{SubmissionFinalizer, SubmissionOutcome};
pub use store::TokenStore;
pub use validator::{TokenValidation, TokenValidator};
