//! Encrypted storage for signed documents
//!
//! Signed PDFs are encrypted at rest with versioned keys and served back
//! only to the owning case. Encryption parameters travel alongside each
//! record so documents survive key rotation.

pub mod crypto;
pub mod store;

pub use crypto::DocumentCipher;
pub use store::{DocumentVault, RetrievedDocument, StoredDocument};
