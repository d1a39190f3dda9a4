use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC signing secret. No default: startup fails when it is missing.
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub otp_ttl_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailgunConfig {
    pub domain: String,
    pub api_key: String,
    pub sender: String,
    #[serde(default = "default_mailgun_base_url")]
    pub base_url: String,
    #[serde(default = "default_mailgun_timeout")]
    pub timeout_secs: u64,
}

fn default_mailgun_base_url() -> String {
    "https://api.mailgun.net".to_string()
}

fn default_mailgun_timeout() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_any_origin: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    pub max_age: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub mailgun: Option<MailgunConfig>,
    pub cors: CorsConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let settings: Settings = Self::defaults()?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // `APP_SERVER__PORT=5001` sets `Settings.server.port`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            )
            .set_override_option("auth.jwt_secret", env::var("JWT_SECRET_KEY").ok())?
            .set_override_option("mailgun.domain", env::var("MAILGUN_DOMAIN").ok())?
            .set_override_option("mailgun.api_key", env::var("MAILGUN_API_KEY").ok())?
            .set_override_option("mailgun.sender", env::var("MAILGUN_SENDER").ok())?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", "development")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("auth.token_ttl_hours", 24)?
            .set_default("auth.otp_ttl_minutes", 10)?
            .set_default("cors.enabled", true)?
            .set_default("cors.allow_any_origin", false)?
            .set_default("cors.max_age", 3600)
    }

    /// Checks that cannot be expressed through deserialization alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "JWT_SECRET_KEY must be set to a non-empty value".into(),
            ));
        }
        if self.auth.token_ttl_hours <= 0 || self.auth.otp_ttl_minutes <= 0 {
            return Err(ConfigError::Message("token and OTP lifetimes must be positive".into()));
        }
        match &self.mailgun {
            Some(mailgun) => {
                Url::parse(&mailgun.base_url).map_err(|e| {
                    ConfigError::Message(format!("invalid mailgun.base_url: {}", e))
                })?;
            }
            None if self.is_production() => {
                return Err(ConfigError::Message(
                    "MAILGUN_DOMAIN, MAILGUN_API_KEY and MAILGUN_SENDER are required in production"
                        .into(),
                ));
            }
            None => {}
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    #[cfg(test)]
    pub fn new_for_test() -> Result<Self, ConfigError> {
        Self::defaults()?
            .set_override("environment", "test")?
            .set_override("server.workers", 1)?
            .set_override("auth.jwt_secret", "test_secret")?
            .build()?
            .try_deserialize()
    }
}
