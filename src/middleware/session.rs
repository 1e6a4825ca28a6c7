// SPDX-License-Identifier: MIT

//! Session gateway middleware.
//!
//! Runs in front of every route. Per request it:
//! - reads the session cookies,
//! - verifies the access token locally (HS256, provider JWT secret),
//! - performs at most one refresh for an expired-but-refreshable session,
//! - inserts a [`CurrentIdentity`] into request extensions,
//! - rewrites the outgoing session cookies when a refresh occurred, or
//!   clears them when the session is irrecoverable.

use crate::cookies::{self, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::error::AppError;
use crate::models::{Identity, Session};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Claims carried in a provider-issued access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (user id)
    pub sub: String,
    /// Email address
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl SessionClaims {
    /// The identity these claims attest to.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub.clone(),
            email: self.email.clone(),
            issued_at: Utc.timestamp_opt(self.iat, 0).single().unwrap_or_default(),
            expires_at: Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default(),
        }
    }

    /// Whether the token behind these claims has expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Identity context attached to every request by the gateway.
#[derive(Debug, Clone)]
pub enum CurrentIdentity {
    Anonymous,
    Authenticated(Identity),
}

impl CurrentIdentity {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            CurrentIdentity::Anonymous => None,
            CurrentIdentity::Authenticated(identity) => Some(identity),
        }
    }

    /// The acting identity, or `Unauthenticated` for anonymous requests.
    pub fn require(&self) -> Result<&Identity, AppError> {
        self.identity().ok_or(AppError::Unauthenticated)
    }
}

/// Verify an access token's signature and decode its claims.
///
/// Expiry is deliberately NOT validated here: the gateway needs to tell an
/// expired-but-well-signed token (refreshable) apart from a forged one
/// (cleared outright), so it judges `exp` itself.
pub fn verify_session_token(token: &str, secret: &[u8]) -> Result<SessionClaims, AppError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;

    decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthenticated)
}

/// Mint a session token. Used by the in-memory provider mode; the hosted
/// provider signs its own tokens with the same secret.
pub fn issue_session_token(
    user_id: &str,
    email: &str,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    secret: &[u8],
) -> anyhow::Result<String> {
    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: issued_at.timestamp(),
        exp: expires_at.timestamp(),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )?)
}

/// What the gateway decided to do with the outgoing session cookies.
enum CookieAction {
    /// Valid session or no session: passthrough, no cookie writes.
    Passthrough,
    /// Refresh succeeded: attach the renewed session's cookies.
    Renew(Session),
    /// Stale or irrecoverable session state: attach removal cookies.
    Clear,
}

/// Gateway middleware. Must be layered so it runs before any handler reads
/// identity; handlers observe the session-refresh decision as already made.
pub async fn session_gateway(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let (identity, action) = resolve_session(&state, &jar).await;
    request.extensions_mut().insert(identity);

    let mut response = next.run(request).await;

    // A handler that already wrote our session cookies (login, logout) wins;
    // the gateway must not stack a second, contradictory Set-Cookie on top.
    if handler_wrote_session_cookies(&response) {
        return response;
    }

    let secure = state.config.secure_cookies();
    match action {
        CookieAction::Passthrough => {}
        CookieAction::Renew(session) => {
            for cookie in cookies::session_cookies(&session, secure) {
                append_set_cookie(&mut response, &cookie.to_string());
            }
        }
        CookieAction::Clear => {
            for cookie in cookies::removal_cookies(secure) {
                append_set_cookie(&mut response, &cookie.to_string());
            }
        }
    }

    response
}

/// Per-request session state machine:
/// `NoSession -> SessionPresentValid | SessionPresentExpired -> RefreshInFlight
///  -> SessionPresentValid | NoSession`.
async fn resolve_session(state: &AppState, jar: &CookieJar) -> (CurrentIdentity, CookieAction) {
    let access_token = jar.get(ACCESS_COOKIE).map(|c| c.value().to_string());
    let refresh_token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    let now = Utc::now();
    let secret = &state.config.provider_jwt_secret;

    match access_token {
        None => match refresh_token {
            // No session at all: anonymous passthrough.
            None => (CurrentIdentity::Anonymous, CookieAction::Passthrough),
            // Access cookie lost but a refresh token survives: treat as an
            // expired session and attempt the one allowed refresh.
            Some(refresh) => refresh_once(state, &refresh).await,
        },
        Some(token) => match verify_session_token(&token, secret) {
            Ok(claims) if !claims.is_expired_at(now) => (
                CurrentIdentity::Authenticated(claims.identity()),
                CookieAction::Passthrough,
            ),
            Ok(claims) => match refresh_token {
                Some(refresh) => {
                    tracing::debug!(user_id = %claims.sub, "Session expired, refreshing");
                    refresh_once(state, &refresh).await
                }
                None => {
                    tracing::debug!(user_id = %claims.sub, "Session expired, no refresh token");
                    (CurrentIdentity::Anonymous, CookieAction::Clear)
                }
            },
            Err(_) => {
                // Bad signature or garbage token: not a refreshable session.
                tracing::warn!("Rejecting session cookie that failed verification");
                (CurrentIdentity::Anonymous, CookieAction::Clear)
            }
        },
    }
}

/// The at-most-once-per-request refresh. Any failure, including a provider
/// network error, degrades the request to anonymous rather than failing it.
async fn refresh_once(state: &AppState, refresh_token: &str) -> (CurrentIdentity, CookieAction) {
    match state.auth.refresh_session(refresh_token).await {
        Ok(session) => {
            match verify_session_token(&session.access_token, &state.config.provider_jwt_secret) {
                Ok(claims) => {
                    tracing::debug!(user_id = %claims.sub, "Session refreshed");
                    (
                        CurrentIdentity::Authenticated(claims.identity()),
                        CookieAction::Renew(session),
                    )
                }
                Err(_) => {
                    tracing::error!("Refreshed session token failed verification");
                    (CurrentIdentity::Anonymous, CookieAction::Clear)
                }
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "Session refresh failed, degrading to anonymous");
            (CurrentIdentity::Anonymous, CookieAction::Clear)
        }
    }
}

fn handler_wrote_session_cookies(response: &Response) -> bool {
    response.headers().get_all(SET_COOKIE).iter().any(|value| {
        value
            .to_str()
            .map(|v| v.starts_with(ACCESS_COOKIE) || v.starts_with(REFRESH_COOKIE))
            .unwrap_or(false)
    })
}

fn append_set_cookie(response: &mut Response, cookie: &str) {
    match cookie.parse() {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(_) => tracing::error!("Failed to encode session cookie header"),
    }
}
