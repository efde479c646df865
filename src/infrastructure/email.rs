use serde_json::{json, Value};
use std::time::Duration;

use crate::domain::errors::DomainError;
use crate::domain::ports::{EmailSink, EmailTemplate};

/// Hands rendered-template requests to the mail relay over HTTP. Rendering
/// and SMTP delivery are the relay's problem.
#[derive(Clone)]
pub struct HttpEmailSink {
    http: reqwest::blocking::Client,
    relay_url: String,
}

impl HttpEmailSink {
    pub fn new(relay_url: impl Into<String>) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build email HTTP client");
        HttpEmailSink {
            http,
            relay_url: relay_url.into(),
        }
    }
}

impl EmailSink for HttpEmailSink {
    fn send(&self, template: EmailTemplate, recipient: &str, context: &Value) -> Result<(), DomainError> {
        let response = self
            .http
            .post(&self.relay_url)
            .json(&json!({
                "template": template.name(),
                "recipient": recipient,
                "context": context,
            }))
            .send()
            .map_err(|e| DomainError::Internal(format!("email relay unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(DomainError::Internal(format!(
                "email relay returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
