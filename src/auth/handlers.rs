use actix_web::{web, HttpResponse};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::auth::middleware::SessionContext;
use crate::auth::password::{hash_password, is_valid_email, normalize_email, PasswordPolicy};
use crate::db::{ActiveSession, NewUser};
use crate::error::{AppError, AuthError, OtpError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

fn message(text: impl Into<String>) -> serde_json::Value {
    serde_json::json!({ "message": text.into() })
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for email: {}", req.email);

    if req.username.trim().is_empty() {
        return Err(AppError::Validation("Invalid input".into()));
    }
    if !is_valid_email(&req.email) {
        return Err(OtpError::InvalidEmail.into());
    }
    if !PasswordPolicy::validate(&req.password) {
        return Err(OtpError::WeakPassword.into());
    }

    let new_user = NewUser {
        username: req.username.trim().to_string(),
        email: normalize_email(&req.email),
        password_hash: hash_password(&req.password)?,
    };

    match state.users.create_user(new_user).await {
        Ok(user) => {
            info!("Registered user {} for email: {}", user.id, user.email);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "User registered successfully",
                "user_id": user.id,
            })))
        }
        Err(e) => {
            error!("Registration failed for email: {}: {}", req.email, e);
            Err(e.into())
        }
    }
}

/// Starts the OTP challenge for a credential.
pub async fn verify_otp(
    req: web::Json<OtpRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received OTP request for email: {}", req.email);
    state.otp.generate(&req.email, &req.password).await?;
    Ok(HttpResponse::Ok().json(message("OTP sent successfully")))
}

/// Completes the OTP challenge and opens a session.
pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for email: {}", req.email);

    // Resolve the account first so an unknown email never burns its code.
    let user = match state.users.find_by_email(&normalize_email(&req.email)).await? {
        Some(user) => user,
        None => {
            warn!("Login attempted for unregistered email: {}", req.email);
            return Err(AuthError::UnknownAccount.into());
        }
    };

    if let Err(e) = state.otp.verify(&req.email, &req.otp).await {
        warn!("Login failed for email: {}: {}", req.email, e);
        return Err(e.into());
    }

    let issued = state.tokens.issue(user.id).map_err(|e| {
        error!("Failed to generate token for user {}: {}", user.id, e);
        e
    })?;

    let expires_at = Utc
        .timestamp_opt(issued.claims.expires_at, 0)
        .single()
        .ok_or_else(|| AppError::Internal("token expiry out of range".into()))?;
    state
        .sessions
        .activate(ActiveSession {
            session_id: issued.claims.session_id,
            user_id: user.id,
            expires_at,
        })
        .await?;

    info!("Login successful for user {} (session {})", user.id, issued.claims.session_id);
    Ok(HttpResponse::Ok().json(AuthResponse { token: issued.token }))
}

pub async fn logout(
    context: SessionContext,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.sessions.revoke(context.session_id).await?;
    info!("Session {} revoked for user {}", context.session_id, context.user_id);
    Ok(HttpResponse::Ok().json(message("Successfully logged out")))
}

pub async fn me(context: SessionContext) -> HttpResponse {
    HttpResponse::Ok().json(context)
}

pub async fn social_login(provider: web::Path<String>) -> HttpResponse {
    info!("Social login requested for provider: {}", provider);
    HttpResponse::Ok().json(message(format!("Logged in with {}", provider)))
}

pub async fn forgot_password() -> HttpResponse {
    HttpResponse::Ok().json(message("Password reset instructions sent"))
}

pub async fn change_password(context: SessionContext) -> HttpResponse {
    info!("Password change requested by user {}", context.user_id);
    HttpResponse::Ok().json(message("Password changed successfully"))
}
