//! Completion email delivery over an HTTP email API

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::db::schemas::DocumentType;
use crate::types::{Result, SignetError};

/// What the signer receives after completing a form
#[derive(Debug, Clone)]
pub struct CompletionEmail {
    pub to: String,
    pub name: String,
    pub document_type: DocumentType,
    pub case_number: String,
}

/// Human-readable label for email copy
fn document_label(document_type: DocumentType) -> &'static str {
    match document_type {
        DocumentType::ClaimsForm => "claims form",
        DocumentType::AuthorityToAct => "authority to act",
        DocumentType::RentalAgreement => "rental agreement",
    }
}

/// Render subject and body for a completion email
pub fn render(email: &CompletionEmail) -> (String, String) {
    let label = document_label(email.document_type);
    let subject = format!("Your signed {} has been received", label);
    let body = format!(
        "Hi {},\n\n\
         We have received your signed {} for case {}. \
         A copy has been stored securely against your claim; no further \
         action is needed from you for this document.\n\n\
         Kind regards,\nThe Claims Team",
        email.name, label, email.case_number
    );
    (subject, body)
}

/// Wire payload for the email API
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Seam for completion delivery so the finalizer can be exercised with a
/// fake sender.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn send_completion(&self, email: &CompletionEmail) -> Result<()>;
}

/// Completion mailer backed by an HTTP email API
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: Option<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl CompletionNotifier for HttpMailer {
    async fn send_completion(&self, email: &CompletionEmail) -> Result<()> {
        let (subject, text) = render(email);
        let payload = SendRequest {
            from: &self.from,
            to: &email.to,
            subject: &subject,
            text: &text,
        };

        let mut request = self.client.post(&self.api_url).json(&payload);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SignetError::Upstream(format!(
                "Email API returned {}",
                response.status()
            )));
        }

        debug!("Completion email sent to {} for case {}", email.to, email.case_number);
        Ok(())
    }
}

/// Sender used when no email API is configured
pub struct NoopMailer;

#[async_trait]
impl CompletionNotifier for NoopMailer {
    async fn send_completion(&self, email: &CompletionEmail) -> Result<()> {
        debug!(
            "Email disabled; skipping completion notification to {} for case {}",
            email.to, email.case_number
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_mentions_case_and_document() {
        let email = CompletionEmail {
            to: "jane@example.com".into(),
            name: "Jane".into(),
            document_type: DocumentType::AuthorityToAct,
            case_number: "CASE-2025-001".into(),
        };
        let (subject, body) = render(&email);
        assert!(subject.contains("authority to act"));
        assert!(body.contains("Jane"));
        assert!(body.contains("CASE-2025-001"));
        assert!(body.contains("authority to act"));
    }

    #[test]
    fn test_payload_field_names() {
        let payload = SendRequest {
            from: "claims@example.com",
            to: "jane@example.com",
            subject: "s",
            text: "t",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["from"], "claims@example.com");
        assert_eq!(json["to"], "jane@example.com");
        assert_eq!(json["subject"], "s");
        assert_eq!(json["text"], "t");
    }
}
