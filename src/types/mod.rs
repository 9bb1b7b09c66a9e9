//! Shared types for Signet

pub mod error;

pub use error::{Result, SignetError};
