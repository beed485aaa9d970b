//! Delivery of one-time codes
//!
//! `OtpSender` is the seam between the sign-in flow and whatever actually
//! reaches the phone. The webhook sender posts to an SMS gateway; the log
//! sender is for local development.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::PhoneNumber;

/// Webhook request timeout
const WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Error while delivering a code
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook rejected the message with status {0}")]
    Rejected(u16),
}

/// Delivers a one-time code to a phone number
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send(&self, phone: &PhoneNumber, code: &str) -> Result<(), SendError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Writes codes to the log instead of sending them
#[derive(Debug, Default)]
pub struct LogSender;

#[async_trait]
impl OtpSender for LogSender {
    async fn send(&self, phone: &PhoneNumber, code: &str) -> Result<(), SendError> {
        tracing::info!(phone = phone.as_str(), code, "one-time code (log sender)");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    phone_number: &'a str,
    message: String,
}

/// Posts codes as JSON to an SMS gateway webhook
pub struct WebhookSender {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl WebhookSender {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }
}

#[async_trait]
impl OtpSender for WebhookSender {
    async fn send(&self, phone: &PhoneNumber, code: &str) -> Result<(), SendError> {
        let payload = WebhookPayload {
            phone_number: phone.as_str(),
            message: format!("Your Expertly verification code is {code}"),
        };
        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "sms webhook rejected code");
            return Err(SendError::Rejected(status.as_u16()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Keeps sent codes in memory, for tests and scripted sign-ins
#[derive(Debug, Default)]
pub struct MemorySender {
    sent: Mutex<Vec<(String, String)>>,
}

impl MemorySender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent code sent to `phone`
    pub fn last_code(&self, phone: &PhoneNumber) -> Option<String> {
        let sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.iter()
            .rev()
            .find(|(to, _)| to == phone.as_str())
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl OtpSender for MemorySender {
    async fn send(&self, phone: &PhoneNumber, code: &str) -> Result<(), SendError> {
        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.push((phone.as_str().to_owned(), code.to_owned()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
