use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pending one-time passcode for an email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl OtpRecord {
    pub fn new(email: String, code: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            email,
            code,
            issued_at: now,
            expires_at: now + ttl,
            consumed: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Server-side record of an issued session that has not been revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    pub session_id: Uuid,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

impl ActiveSession {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}
