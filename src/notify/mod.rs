//! Completion notifications
//!
//! Email is a best-effort side effect of submission: failures are logged
//! and never abort an otherwise-successful finalization.

pub mod mailer;

pub use mailer::{CompletionEmail, CompletionNotifier, HttpMailer, NoopMailer};
