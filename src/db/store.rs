use async_trait::async_trait;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::db::models::{ActiveSession, NewUser, OtpRecord, User};
use crate::error::StoreError;

/// Time-bounded storage for one-time passcodes, keyed by email.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Persists `record`, replacing any earlier record for the same email.
    async fn store_otp(&self, record: OtpRecord) -> Result<(), StoreError>;

    /// Returns the newest record for `email`.
    async fn load_otp(&self, email: &str) -> Result<Option<OtpRecord>, StoreError>;

    /// Marks the record for `email` consumed if it is still unconsumed and
    /// carries `code`. Returns `true` only for the call that performed the
    /// transition, so concurrent verifications of one code cannot both win.
    async fn mark_consumed(&self, email: &str, code: &str) -> Result<bool, StoreError>;

    /// Drops the record for `email` only if it still carries `code`, so a
    /// rollback never removes a newer challenge. Returns whether it was removed.
    async fn discard(&self, email: &str, code: &str) -> Result<bool, StoreError>;
}

/// Revocation store consulted by the request gate.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn activate(&self, session: ActiveSession) -> Result<(), StoreError>;

    async fn is_session_active(&self, session_id: Uuid) -> Result<bool, StoreError>;

    async fn revoke(&self, session_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user. Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}
