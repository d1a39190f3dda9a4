use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::OsRng;
use tracing::{debug, error, info, warn};

use crate::auth::notifier::Notifier;
use crate::auth::password::{is_valid_email, normalize_email, PasswordPolicy};
use crate::db::{OtpRecord, OtpStore};
use crate::error::{DeliveryError, OtpError};

pub const OTP_LENGTH: usize = 6;

/// Issues one-time passcodes and checks them back.
pub struct OtpChallenge {
    store: Arc<dyn OtpStore>,
    notifier: Arc<dyn Notifier>,
    ttl: Duration,
    delivery_timeout: StdDuration,
}

impl OtpChallenge {
    pub fn new(
        store: Arc<dyn OtpStore>,
        notifier: Arc<dyn Notifier>,
        ttl: Duration,
        delivery_timeout: StdDuration,
    ) -> Self {
        Self {
            store,
            notifier,
            ttl,
            delivery_timeout,
        }
    }

    /// Validates the credential, stores a fresh code and sends it.
    ///
    /// Either both the store and the send succeed, or the record is discarded
    /// and the caller gets an error.
    pub async fn generate(&self, email: &str, password: &str) -> Result<OtpRecord, OtpError> {
        if !is_valid_email(email) {
            return Err(OtpError::InvalidEmail);
        }
        if !PasswordPolicy::validate(password) {
            return Err(OtpError::WeakPassword);
        }

        let email = normalize_email(email);
        let record = OtpRecord::new(email.clone(), generate_code(), self.ttl);
        self.store.store_otp(record.clone()).await?;

        let sent = tokio::time::timeout(
            self.delivery_timeout,
            self.notifier.send_code(&email, &record.code),
        )
        .await
        .unwrap_or(Err(DeliveryError::TimedOut));

        if let Err(e) = sent {
            error!("Failed to deliver OTP to {}: {}", email, e);
            // Only this challenge's record; a concurrent generate may have replaced it.
            if let Err(discard_err) = self.store.discard(&email, &record.code).await {
                // The TTL still bounds the undelivered record.
                warn!("Could not discard undelivered OTP for {}: {}", email, discard_err);
            }
            return Err(OtpError::DeliveryFailed(e));
        }

        info!("OTP issued for {}", email);
        Ok(record)
    }

    /// Consumes the pending code for `email` if `submitted` matches it.
    pub async fn verify(&self, email: &str, submitted: &str) -> Result<(), OtpError> {
        let email = normalize_email(email);
        let record = match self.store.load_otp(&email).await? {
            Some(record) if !record.consumed => record,
            _ => return Err(OtpError::NotFound),
        };

        if Utc::now() > record.expires_at {
            debug!("Expired OTP presented for {}", email);
            return Err(OtpError::Expired);
        }

        if !constant_time_eq(record.code.as_bytes(), submitted.as_bytes()) {
            warn!("OTP mismatch for {}", email);
            return Err(OtpError::Mismatch);
        }

        if !self.store.mark_consumed(&email, &record.code).await? {
            // Another request consumed it between load and mark.
            return Err(OtpError::NotFound);
        }

        info!("OTP verified for {}", email);
        Ok(())
    }
}

/// Six independent uniform digits from the OS CSPRNG.
pub fn generate_code() -> String {
    let digits = Uniform::from(0u8..10);
    let mut rng = OsRng;
    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + digits.sample(&mut rng)))
        .collect()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
