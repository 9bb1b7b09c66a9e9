//! Submission finalization
//!
//! Turns a completed form plus signed PDF into a stored, encrypted
//! artifact and a completed token. Ordering:
//!
//! 1. gate the token (`NotFound` / `Expired` / `AlreadyCompleted`)
//! 2. encrypt and persist the artifact
//! 3. complete the token with a single conditional update
//! 4. fire the completion email post-commit, detached
//!
//! The conditional update in step 3 is the idempotence guard: when two
//! submissions race on the same token, exactly one update matches and
//! the loser's just-written artifact is discarded, so the stored
//! `pdf_url` always reflects the winner alone.

use bson::{DateTime, Document};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::{CaseDoc, DocumentType};
use crate::notify::{CompletionEmail, CompletionNotifier};
use crate::tokens::validator::ensure_usable;
use crate::tokens::{CaseStore, TokenStore};
use crate::types::{Result, SignetError};
use crate::vault::DocumentVault;

/// Outcome of a successful submission
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub pdf_url: String,
    pub case_id: String,
}

/// Reject an empty or obviously-non-PDF artifact before touching storage
pub fn ensure_artifact(signed_pdf: &[u8]) -> Result<()> {
    if signed_pdf.is_empty() {
        return Err(SignetError::Validation("Signed PDF is empty".into()));
    }
    if !signed_pdf.starts_with(b"%PDF") {
        return Err(SignetError::Validation(
            "Signed document is not a PDF".into(),
        ));
    }
    Ok(())
}

/// Build the completion email for a finished submission. `None` when the
/// case is not on record, which skips delivery.
pub fn completion_email_for(
    case: Option<CaseDoc>,
    document_type: DocumentType,
    case_number: &str,
) -> Option<CompletionEmail> {
    let case = case?;
    Some(CompletionEmail {
        to: case.hirer_email,
        name: case.hirer_name,
        document_type,
        case_number: case_number.to_string(),
    })
}

/// Coordinates token completion across store, vault, and notifier
#[derive(Clone)]
pub struct SubmissionFinalizer {
    tokens: TokenStore,
    vault: DocumentVault,
    cases: CaseStore,
    notifier: Arc<dyn CompletionNotifier>,
}

impl SubmissionFinalizer {
    pub fn new(
        tokens: TokenStore,
        vault: DocumentVault,
        cases: CaseStore,
        notifier: Arc<dyn CompletionNotifier>,
    ) -> Self {
        Self {
            tokens,
            vault,
            cases,
            notifier,
        }
    }

    /// Finalize a submission for `token`
    pub async fn submit(
        &self,
        token: &str,
        expected_type: DocumentType,
        final_form_data: Document,
        signed_pdf: Vec<u8>,
    ) -> Result<SubmissionOutcome> {
        ensure_artifact(&signed_pdf)?;

        let now = DateTime::now();
        let doc = self.tokens.get_by_token(token).await?;
        ensure_usable(doc.as_ref(), now)?;
        let Some(doc) = doc else {
            return Err(SignetError::NotFound("Unknown token".into()));
        };

        if doc.document_type != expected_type {
            return Err(SignetError::NotFound("Unknown token".into()));
        }

        let stored = self
            .vault
            .store(&doc.case_id, doc.document_type, &signed_pdf, now)
            .await?;

        let completed = self
            .tokens
            .complete(token, final_form_data, &stored.pdf_url, now)
            .await?;

        let Some(completed) = completed else {
            // Lost the race: another submission finalized this token
            // between the gate and the conditional update. Their artifact
            // stands; ours goes.
            self.vault.discard(&stored).await;
            return Err(SignetError::AlreadyCompleted(format!(
                "Token for case {} is already completed",
                doc.case_id
            )));
        };

        info!(
            "Completed {} for case {} ({})",
            completed.document_type, completed.case_id, stored.file_name
        );

        self.spawn_notification(completed.case_id.clone(), completed.document_type);

        Ok(SubmissionOutcome {
            pdf_url: stored.pdf_url,
            case_id: doc.case_id,
        })
    }

    /// Post-commit hook: send the completion email on a detached task so
    /// delivery problems cannot roll back the submission.
    fn spawn_notification(&self, case_id: String, document_type: DocumentType) {
        let cases = self.cases.clone();
        let notifier = Arc::clone(&self.notifier);

        tokio::spawn(async move {
            let case = match cases.get_by_number(&case_id).await {
                Ok(case) => case,
                Err(e) => {
                    warn!("Case lookup failed for completion email: {}", e);
                    return;
                }
            };

            let Some(email) = completion_email_for(case, document_type, &case_id) else {
                warn!("No case {} on record; skipping completion email", case_id);
                return;
            };

            if let Err(e) = notifier.send_completion(&email).await {
                warn!("Completion email for case {} failed: {}", case_id, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_artifact_rejected() {
        assert!(matches!(
            ensure_artifact(b""),
            Err(SignetError::Validation(_))
        ));
    }

    #[test]
    fn test_non_pdf_artifact_rejected() {
        assert!(matches!(
            ensure_artifact(b"<html>not a pdf</html>"),
            Err(SignetError::Validation(_))
        ));
    }

    #[test]
    fn test_pdf_artifact_accepted() {
        assert!(ensure_artifact(b"%PDF-1.7 ...").is_ok());
    }

    fn case_for(email: &str) -> CaseDoc {
        CaseDoc {
            case_number: "CASE-2025-001".into(),
            hirer_name: "Jane".into(),
            hirer_email: email.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_case_skips_email() {
        assert!(completion_email_for(None, DocumentType::ClaimsForm, "CASE-2025-001").is_none());
    }

    #[test]
    fn test_completion_email_addresses_hirer() {
        let email = completion_email_for(
            Some(case_for("jane@example.com")),
            DocumentType::ClaimsForm,
            "CASE-2025-001",
        )
        .unwrap();
        assert_eq!(email.to, "jane@example.com");
        assert_eq!(email.name, "Jane");
        assert_eq!(email.case_number, "CASE-2025-001");
    }

    struct RecordingNotifier {
        sent: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl CompletionNotifier for RecordingNotifier {
        async fn send_completion(&self, email: &CompletionEmail) -> Result<()> {
            self.sent.lock().unwrap().push(email.to.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_notifier_seam_records_delivery() {
        let notifier = RecordingNotifier {
            sent: std::sync::Mutex::new(Vec::new()),
        };

        let email = completion_email_for(
            Some(case_for("jane@example.com")),
            DocumentType::AuthorityToAct,
            "CASE-2025-001",
        )
        .unwrap();

        notifier.send_completion(&email).await.unwrap();
        assert_eq!(*notifier.sent.lock().unwrap(), ["jane@example.com"]);
    }
}
