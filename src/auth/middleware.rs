use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderValue, AUTHORIZATION};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, ResponseError};
use futures::future::{ready, LocalBoxFuture, Ready};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::session::TokenService;
use crate::db::SessionStore;
use crate::error::{AppError, AuthError, GateError};

/// Identity attached to a request that passed the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub user_id: i64,
    pub session_id: Uuid,
}

/// Runs the gate for one request: header present, `Bearer <token>` shape,
/// valid token, active session. Every failure is terminal.
pub async fn authorize(
    header: Option<&HeaderValue>,
    tokens: &TokenService,
    sessions: &dyn SessionStore,
) -> Result<SessionContext, GateError> {
    let header = header.ok_or(GateError::NoHeader)?;
    let header = header.to_str().map_err(|_| GateError::BadHeaderFormat)?;

    let parts: Vec<&str> = header.split(' ').collect();
    let token = match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => *token,
        _ => return Err(GateError::BadHeaderFormat),
    };

    let claims = tokens.verify(token).map_err(GateError::InvalidToken)?;

    if !sessions.is_session_active(claims.session_id).await? {
        return Err(GateError::RevokedSession);
    }

    Ok(SessionContext {
        user_id: claims.user_id,
        session_id: claims.session_id,
    })
}

/// Wraps a service so that only requests carrying an active session reach it.
#[derive(Clone)]
pub struct RequireSession {
    tokens: Arc<TokenService>,
    sessions: Arc<dyn SessionStore>,
}

impl RequireSession {
    pub fn new(tokens: Arc<TokenService>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { tokens, sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireSession
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RequireSessionMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireSessionMiddleware {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct RequireSessionMiddleware<S> {
    service: Rc<S>,
    tokens: Arc<TokenService>,
    sessions: Arc<dyn SessionStore>,
}

impl<S, B> Service<ServiceRequest> for RequireSessionMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let tokens = self.tokens.clone();
        let sessions = self.sessions.clone();

        Box::pin(async move {
            let header = req.headers().get(AUTHORIZATION).cloned();
            match authorize(header.as_ref(), &tokens, sessions.as_ref()).await {
                Ok(context) => {
                    debug!(
                        "Authorized user {} (session {}) for {}",
                        context.user_id,
                        context.session_id,
                        req.path()
                    );
                    req.extensions_mut().insert(context);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(err) => {
                    warn!("Rejected request to {}: {}", req.path(), err);
                    let response = AppError::from(err).error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

impl FromRequest for SessionContext {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<SessionContext>()
                .copied()
                .ok_or(AppError::Auth(AuthError::Unauthorized)),
        )
    }
}
