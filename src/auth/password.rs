use std::sync::OnceLock;

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use regex::Regex;

use crate::error::AppError;

const MIN_LEN: usize = 8;
const MAX_LEN: usize = 20;
const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Password strength rules applied before any OTP is issued.
pub struct PasswordPolicy;

impl PasswordPolicy {
    /// Length in `[8, 20]` characters with at least one uppercase letter,
    /// lowercase letter, digit and special character.
    pub fn validate(password: &str) -> bool {
        let len = password.chars().count();
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            return false;
        }

        let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_special = password.chars().any(|c| SPECIAL_CHARS.contains(c));

        has_upper && has_lower && has_digit && has_special
    }
}

/// `local@domain.tld`, case-insensitive, with a 2 to 4 letter TLD.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE
        .get_or_init(|| Regex::new(r"(?i)^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,4}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

/// Canonical form used as the store key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Argon2id hash in PHC string format.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}
