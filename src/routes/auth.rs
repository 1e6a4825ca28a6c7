// SPDX-License-Identifier: MIT

//! Authentication routes: sign-up, sign-in, sign-out, session introspection.
//!
//! Handlers own the session cookie writes for explicit auth actions; the
//! gateway only rewrites cookies for transparent refreshes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::cookies::{self, ACCESS_COOKIE};
use crate::error::{AppError, Result};
use crate::middleware::session::{verify_session_token, CurrentIdentity};
use crate::models::{Identity, Session};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/login", post(sign_in))
        .route("/auth/logout", post(sign_out))
        .route("/auth/session", get(current_session))
}

/// Email/password credentials for sign-in and sign-up.
#[derive(Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

/// Identity as exposed over the API.
#[derive(Serialize)]
pub struct IdentityResponse {
    pub id: String,
    pub email: String,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
        }
    }
}

/// Three-state session introspection result. `loading` exists only on the
/// client; by the time a request reaches the server the gateway has already
/// resolved one of these two.
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionResponse {
    Authenticated { identity: IdentityResponse },
    Anonymous,
}

/// Register a new account and open its session.
async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(CookieJar, (StatusCode, Json<IdentityResponse>))> {
    let session = state
        .auth
        .sign_up(&credentials.email, &credentials.password)
        .await?;
    let identity = identity_from(&session, &state.config)?;

    tracing::info!(user_id = %identity.id, "Account created");

    Ok((
        with_session_cookies(jar, &session, &state.config),
        (StatusCode::CREATED, Json(IdentityResponse::from(&identity))),
    ))
}

/// Sign in with email and password.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(CookieJar, Json<IdentityResponse>)> {
    let session = state
        .auth
        .sign_in(&credentials.email, &credentials.password)
        .await?;
    let identity = identity_from(&session, &state.config)?;

    tracing::info!(user_id = %identity.id, "Signed in");

    Ok((
        with_session_cookies(jar, &session, &state.config),
        Json(IdentityResponse::from(&identity)),
    ))
}

/// Sign out. The session cookies are cleared even when the provider call
/// fails; a user-initiated logout always wins locally.
async fn sign_out(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        if let Err(err) = state.auth.sign_out(cookie.value()).await {
            tracing::warn!(error = %err, "Remote sign-out failed, clearing session cookies anyway");
        }
    }

    let mut jar = jar;
    for cookie in cookies::removal_cookies(state.config.secure_cookies()) {
        jar = jar.add(cookie);
    }
    (jar, StatusCode::NO_CONTENT)
}

/// Session state as resolved by the gateway for this request.
async fn current_session(Extension(identity): Extension<CurrentIdentity>) -> Json<SessionResponse> {
    Json(match identity {
        CurrentIdentity::Authenticated(identity) => SessionResponse::Authenticated {
            identity: IdentityResponse::from(&identity),
        },
        CurrentIdentity::Anonymous => SessionResponse::Anonymous,
    })
}

fn with_session_cookies(jar: CookieJar, session: &Session, config: &Config) -> CookieJar {
    let mut jar = jar;
    for cookie in cookies::session_cookies(session, config.secure_cookies()) {
        jar = jar.add(cookie);
    }
    jar
}

/// The identity attested by a freshly issued session token.
fn identity_from(session: &Session, config: &Config) -> Result<Identity> {
    verify_session_token(&session.access_token, &config.provider_jwt_secret)
        .map(|claims| claims.identity())
        .map_err(|_| {
            AppError::Internal(anyhow::anyhow!(
                "provider issued a session token that fails verification"
            ))
        })
}
