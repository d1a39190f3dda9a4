//! Authentication module for the gateway
//!
//! One-time passcode challenges, session tokens, the request gate
//! and the HTTP handlers built on them.

pub mod handlers;
pub mod middleware;
pub mod notifier;
pub mod otp;
pub mod password;
pub mod session;

pub use middleware::{authorize, RequireSession, SessionContext};
pub use notifier::{LogNotifier, MailgunNotifier, Notifier};
pub use otp::OtpChallenge;
pub use password::PasswordPolicy;
pub use session::{IssuedToken, SessionClaims, TokenService};
