//! Contact form relay over the Resend email API

use crate::api::{endpoint, http_client};
use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;

const PROVIDER: &str = "Resend";
const FROM_ADDRESS: &str = "WhyIs Contact <onboarding@resend.dev>";

/// A message submitted through the contact form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl ContactMessage {
    /// Every field must be non-blank and the email must contain `@`
    pub fn validate(&self) -> Result<()> {
        let blank = |s: &str| s.trim().is_empty();
        if blank(&self.name) || blank(&self.email) || blank(&self.message) {
            return Err(MarketError::InvalidInput("All fields are required.".to_string()));
        }
        if !self.email.contains('@') {
            return Err(MarketError::InvalidInput(
                "Please provide a valid email address.".to_string(),
            ));
        }
        Ok(())
    }

    fn subject(&self) -> String {
        format!("WhyIs contact form — {}", self.name.trim())
    }

    fn body(&self) -> String {
        format!(
            "Name: {}\nEmail: {}\n\nMessage:\n{}",
            self.name.trim(),
            self.email.trim(),
            self.message
        )
    }
}

/// Outbound delivery of contact messages
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &ContactMessage) -> Result<()>;
}

/// Mailer backed by Resend
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: Client,
    base_url: Url,
    api_key: String,
    recipient: String,
}

impl ResendMailer {
    pub fn new(
        api_key: impl Into<String>,
        recipient: impl Into<String>,
        config: &MarketConfig,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.resend_base_url.clone(),
            api_key: api_key.into(),
            recipient: recipient.into(),
        })
    }

    /// Create a mailer when both the API key and the recipient are configured
    pub fn from_config(config: &MarketConfig) -> Result<Option<Self>> {
        match (&config.resend_api_key, &config.contact_email) {
            (Some(key), Some(to)) => Ok(Some(Self::new(key, to, config)?)),
            _ => Ok(None),
        }
    }

    fn email<'a>(&'a self, message: &'a ContactMessage) -> ResendEmail<'a> {
        ResendEmail {
            from: FROM_ADDRESS,
            to: vec![self.recipient.as_str()],
            reply_to: message.email.trim(),
            subject: message.subject(),
            text: message.body(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResendEmail<'a> {
    from: &'static str,
    to: Vec<&'a str>,
    reply_to: &'a str,
    subject: String,
    text: String,
}

#[async_trait]
impl Mailer for ResendMailer {
    #[instrument(skip_all)]
    async fn send(&self, message: &ContactMessage) -> Result<()> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "emails"))
            .bearer_auth(&self.api_key)
            .json(&self.email(message))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MarketError::api(PROVIDER, format!("HTTP {status}: {body}")));
        }

        info!("Contact message relayed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(name: &str, email: &str, body: &str) -> ContactMessage {
        ContactMessage {
            name: name.to_string(),
            email: email.to_string(),
            message: body.to_string(),
        }
    }

    #[test]
    fn test_validation() {
        assert!(message("Ada", "ada@example.com", "Hi").validate().is_ok());
        assert!(matches!(
            message("", "ada@example.com", "Hi").validate(),
            Err(MarketError::InvalidInput(_))
        ));
        assert!(message("Ada", "ada@example.com", "   ").validate().is_err());
        assert!(message("Ada", "not-an-email", "Hi").validate().is_err());
    }

    #[test]
    fn test_missing_fields_deserialize_as_blank() {
        let parsed: ContactMessage = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn test_resend_payload() {
        let config = MarketConfig::default();
        let mailer = ResendMailer::new("re_test", "owner@example.com", &config).unwrap();
        let msg = message("Ada", " ada@example.com ", "Hello\nthere");

        let payload = serde_json::to_value(mailer.email(&msg)).unwrap();
        assert_eq!(payload["from"], FROM_ADDRESS);
        assert_eq!(payload["to"][0], "owner@example.com");
        assert_eq!(payload["reply_to"], "ada@example.com");
        assert_eq!(payload["subject"], "WhyIs contact form — Ada");
        assert_eq!(
            payload["text"],
            "Name: Ada\nEmail: ada@example.com\n\nMessage:\nHello\nthere"
        );
    }

    #[test]
    fn test_from_config_requires_key_and_recipient() {
        let config = MarketConfig::builder().resend_api_key("re_test").build().unwrap();
        assert!(ResendMailer::from_config(&config).unwrap().is_none());

        let config = MarketConfig::builder()
            .resend_api_key("re_test")
            .contact_email("owner@example.com")
            .build()
            .unwrap();
        assert!(ResendMailer::from_config(&config).unwrap().is_some());
    }
}
