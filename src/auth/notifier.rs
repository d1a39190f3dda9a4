use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use url::Url;

#[cfg(test)]
use mockall::automock;

use crate::config::MailgunConfig;
use crate::error::{AppError, DeliveryError};

/// Delivers one-time passcodes to their owner.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), DeliveryError>;
}

pub const OTP_SUBJECT: &str = "Your OTP Code";

pub fn otp_body(code: &str, ttl_minutes: i64) -> String {
    format!(
        "Your OTP code is: {}\nThis code will expire in {} minutes.",
        code, ttl_minutes
    )
}

/// Sends passcodes through the Mailgun messages API.
pub struct MailgunNotifier {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    sender: String,
    ttl_minutes: i64,
}

impl MailgunNotifier {
    pub fn new(config: &MailgunConfig, ttl_minutes: i64) -> Result<Self, AppError> {
        let endpoint = Url::parse(&config.base_url)
            .and_then(|base| base.join(&format!("v3/{}/messages", config.domain)))
            .map_err(|e| AppError::Config(format!("invalid Mailgun endpoint: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            sender: config.sender.clone(),
            ttl_minutes,
        })
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), DeliveryError> {
        let body = otp_body(code, self.ttl_minutes);
        let form = [
            ("from", self.sender.as_str()),
            ("to", email),
            ("subject", OTP_SUBJECT),
            ("text", body.as_str()),
        ];

        let res = self
            .client
            .post(self.endpoint.clone())
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!("Mailgun request for {} failed: {}", email, e);
                DeliveryError::from(e)
            })?;

        let status = res.status();
        if !status.is_success() {
            warn!("Mailgun rejected message to {} with status {}", email, status);
            return Err(DeliveryError::Rejected(status.as_u16()));
        }

        info!("OTP email accepted by Mailgun for {}", email);
        Ok(())
    }
}

/// Development notifier that writes the code to the log instead of sending it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), DeliveryError> {
        debug!("OTP for {}: {}", email, code);
        info!("OTP for {} written to log (no mail transport configured)", email);
        Ok(())
    }
}
