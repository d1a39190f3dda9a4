use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::db::models::{ActiveSession, NewUser, OtpRecord, User};
use crate::db::store::{OtpStore, SessionStore, UserStore};
use crate::error::StoreError;

/// In-process OTP store. One record per email; a new challenge replaces the old one.
#[derive(Debug, Default)]
pub struct MemoryOtpStore {
    records: Arc<RwLock<HashMap<String, OtpRecord>>>,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes expired and consumed records. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.consumed && !record.is_expired());
        let purged = before - records.len();
        if purged > 0 {
            debug!("Purged {} stale OTP records", purged);
        }
        purged
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn store_otp(&self, record: OtpRecord) -> Result<(), StoreError> {
        self.records.write().await.insert(record.email.clone(), record);
        Ok(())
    }

    async fn load_otp(&self, email: &str) -> Result<Option<OtpRecord>, StoreError> {
        Ok(self.records.read().await.get(email).cloned())
    }

    async fn mark_consumed(&self, email: &str, code: &str) -> Result<bool, StoreError> {
        // Check and flip under one write lock.
        let mut records = self.records.write().await;
        match records.get_mut(email) {
            Some(record) if !record.consumed && record.code == code => {
                record.consumed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn discard(&self, email: &str, code: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        match records.get(email) {
            Some(record) if record.code == code => {
                records.remove(email);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, ActiveSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        before - sessions.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn activate(&self, session: ActiveSession) -> Result<(), StoreError> {
        self.sessions.write().await.insert(session.session_id, session);
        Ok(())
    }

    async fn is_session_active(&self, session_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&session_id)
            .map(|session| !session.is_expired())
            .unwrap_or(false))
    }

    async fn revoke(&self, session_id: Uuid) -> Result<(), StoreError> {
        self.sessions.write().await.remove(&session_id);
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    next_id: AtomicI64,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(StoreError::Duplicate);
        }

        let created = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(created.email.clone(), created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(email).cloned())
    }
}
