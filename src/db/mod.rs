//! Storage module for the gateway
//!
//! Record types, the store interfaces the core depends on,
//! and in-memory implementations of those interfaces.

pub mod memory;
pub mod models;
pub mod store;

pub use memory::{MemoryOtpStore, MemorySessionStore, MemoryUserStore};
pub use models::{ActiveSession, NewUser, OtpRecord, User};
pub use store::{OtpStore, SessionStore, UserStore};
