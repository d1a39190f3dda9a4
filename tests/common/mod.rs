#![allow(dead_code)]

use async_trait::async_trait;
use authgate_server::config::{AuthConfig, CorsConfig, ServerConfig};
use authgate_server::error::DeliveryError;
use authgate_server::{
    AppState, MemoryOtpStore, MemorySessionStore, MemoryUserStore, Notifier, Settings,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn test_settings() -> Settings {
    Settings {
        environment: "test".into(),
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            workers: 1,
        },
        auth: AuthConfig {
            jwt_secret: "integration_secret".into(),
            token_ttl_hours: 24,
            otp_ttl_minutes: 10,
        },
        mailgun: None,
        cors: CorsConfig {
            enabled: false,
            allow_any_origin: false,
            allowed_origins: Vec::new(),
            max_age: 3600,
        },
    }
}

/// Keeps the last code sent to each address so tests can complete the challenge.
#[derive(Default)]
pub struct Inbox {
    codes: Mutex<HashMap<String, String>>,
}

impl Inbox {
    pub fn last_code(&self, email: &str) -> Option<String> {
        self.codes.lock().unwrap().get(email).cloned()
    }
}

#[async_trait]
impl Notifier for Inbox {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), DeliveryError> {
        self.codes
            .lock()
            .unwrap()
            .insert(email.to_string(), code.to_string());
        Ok(())
    }
}

/// Always fails, as an unreachable mail provider would.
pub struct DownNotifier;

#[async_trait]
impl Notifier for DownNotifier {
    async fn send_code(&self, _email: &str, _code: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::RequestFailed("connection refused".into()))
    }
}

pub fn state_with(notifier: Arc<dyn Notifier>) -> AppState {
    AppState::from_parts(
        test_settings(),
        Arc::new(MemoryOtpStore::new()),
        notifier,
        Arc::new(MemorySessionStore::new()),
        Arc::new(MemoryUserStore::new()),
    )
    .expect("Failed to build test state")
}
