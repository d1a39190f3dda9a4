pub mod auth;
pub mod config;
pub mod db;
pub mod error;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use actix_web::{web, HttpResponse};
use chrono::Duration;
use tracing::warn;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{
    LogNotifier, MailgunNotifier, Notifier, OtpChallenge, RequireSession, SessionContext,
    TokenService,
};
pub use db::{
    MemoryOtpStore, MemorySessionStore, MemoryUserStore, OtpStore, SessionStore, UserStore,
};

use auth::handlers;

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub otp: Arc<OtpChallenge>,
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<dyn SessionStore>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    /// State backed by the in-memory stores and the notifier the settings select.
    pub fn new(config: Settings) -> Result<Self> {
        let notifier = notifier_from_settings(&config)?;
        Self::from_parts(
            config,
            Arc::new(MemoryOtpStore::new()),
            notifier,
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryUserStore::new()),
        )
    }

    pub fn from_parts(
        config: Settings,
        otp_store: Arc<dyn OtpStore>,
        notifier: Arc<dyn Notifier>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
    ) -> Result<Self> {
        config.validate()?;

        let tokens = TokenService::new(
            &config.auth.jwt_secret,
            Duration::hours(config.auth.token_ttl_hours),
        )?;
        let delivery_timeout = config
            .mailgun
            .as_ref()
            .map(|mailgun| StdDuration::from_secs(mailgun.timeout_secs))
            .unwrap_or(StdDuration::from_secs(10));
        let otp = OtpChallenge::new(
            otp_store,
            notifier,
            Duration::minutes(config.auth.otp_ttl_minutes),
            delivery_timeout,
        );

        Ok(Self {
            config: Arc::new(config),
            otp: Arc::new(otp),
            tokens: Arc::new(tokens),
            sessions,
            users,
        })
    }

    pub fn require_session(&self) -> RequireSession {
        RequireSession::new(self.tokens.clone(), self.sessions.clone())
    }
}

pub fn notifier_from_settings(config: &Settings) -> Result<Arc<dyn Notifier>> {
    match &config.mailgun {
        Some(mailgun) => Ok(Arc::new(MailgunNotifier::new(mailgun, config.auth.otp_ttl_minutes)?)),
        None => {
            warn!("No Mailgun configuration found, OTP codes will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Malformed or mistyped JSON bodies become `400 {"error": "Invalid request format"}`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        warn!("Rejected request body: {}", err);
        AppError::Validation("Invalid request format".into()).into()
    })
}

/// Registers every gateway route. Gated routes are wrapped individually.
pub fn configure_routes(cfg: &mut web::ServiceConfig, gate: RequireSession) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(health_check))
        .route("/register", web::post().to(handlers::register))
        .route("/verify-otp", web::post().to(handlers::verify_otp))
        .route("/social-login/{provider}", web::post().to(handlers::social_login))
        .route("/login", web::post().to(handlers::login))
        .route("/forgot-password", web::post().to(handlers::forgot_password))
        .service(
            web::resource("/change-password")
                .wrap(gate.clone())
                .route(web::post().to(handlers::change_password)),
        )
        .service(
            web::resource("/logout")
                .wrap(gate.clone())
                .route(web::post().to(handlers::logout)),
        )
        .service(
            web::resource("/me")
                .wrap(gate)
                .route(web::get().to(handlers::me)),
        );
}
