use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

pub const WEAK_PASSWORD_MESSAGE: &str =
    "Password must contain at least 8 characters up to 20 characters, \
    1 uppercase, 1 lowercase, 1 number and 1 special character";

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Otp(#[from] OtpError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        // Internal detail stays in the logs, callers only see the summary.
        let message = match self {
            AppError::Token(TokenError::Signing(_)) => "Failed to generate token".to_string(),
            AppError::Store(StoreError::Unavailable(_))
            | AppError::Otp(OtpError::Store(_))
            | AppError::Gate(GateError::Store(_)) => "Storage unavailable".to_string(),
            AppError::Config(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Otp(e) => match e {
                OtpError::InvalidEmail | OtpError::WeakPassword => StatusCode::BAD_REQUEST,
                OtpError::NotFound | OtpError::Expired | OtpError::Mismatch => {
                    StatusCode::UNAUTHORIZED
                }
                OtpError::DeliveryFailed(_) | OtpError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Token(TokenError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Gate(GateError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Gate(_) => StatusCode::UNAUTHORIZED,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Store(StoreError::Duplicate) => StatusCode::BAD_REQUEST,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failures of the one-time passcode challenge.
#[derive(Error, Debug)]
pub enum OtpError {
    #[error("Invalid email format")]
    InvalidEmail,

    #[error("{}", WEAK_PASSWORD_MESSAGE)]
    WeakPassword,

    #[error("Failed to send OTP")]
    DeliveryFailed(#[source] DeliveryError),

    #[error("No pending OTP for this email")]
    NotFound,

    #[error("OTP has expired")]
    Expired,

    #[error("OTP does not match")]
    Mismatch,

    #[error("OTP store error: {0}")]
    Store(#[from] StoreError),
}

/// Failures of session token issuance and verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Unexpected signing algorithm")]
    WrongAlgorithm,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Terminal states of the request gate.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Authorization header is required")]
    NoHeader,

    #[error("Invalid authorization header format")]
    BadHeaderFormat,

    #[error("Invalid or expired token")]
    InvalidToken(#[source] TokenError),

    #[error("Invalid session")]
    RevokedSession,

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unknown account")]
    UnknownAccount,

    #[error("Unauthorized")]
    Unauthorized,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Email already registered")]
    Duplicate,
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Provider rejected message with status {0}")]
    Rejected(u16),

    #[error("Delivery timed out")]
    TimedOut,
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DeliveryError::TimedOut
        } else {
            DeliveryError::RequestFailed(err.to_string())
        }
    }
}
