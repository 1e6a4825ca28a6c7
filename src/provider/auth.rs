// SPDX-License-Identifier: MIT

//! Credential client for the hosted identity provider.
//!
//! Handles:
//! - Email/password sign-in and sign-up
//! - Sign-out (server-side session invalidation)
//! - Session refresh (used by the gateway, at most once per request)
//! - Current-user lookup from an access token
//!
//! The client is constructed once at process start and injected through
//! `AppState`; there is no module-level singleton. An in-memory mode backs
//! offline development and tests with the same contract.

use crate::error::AppError;
use crate::middleware::session::{issue_session_token, verify_session_token};
use crate::models::{Identity, Session};
use chrono::{Duration, TimeZone, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Credential client. Cheap to clone; all modes share their state.
#[derive(Clone)]
pub struct AuthClient {
    inner: AuthBackend,
}

#[derive(Clone)]
enum AuthBackend {
    Http(HttpAuth),
    InMemory(Arc<InMemoryAuth>),
}

impl AuthClient {
    /// Client against the hosted provider's auth endpoints.
    pub fn new(provider_url: &str, api_key: &str) -> Self {
        Self {
            inner: AuthBackend::Http(HttpAuth {
                http: reqwest::Client::new(),
                base_url: format!("{}/auth/v1", provider_url),
                api_key: api_key.to_string(),
            }),
        }
    }

    /// Client against process-local state, for offline development and tests.
    pub fn in_memory(state: Arc<InMemoryAuth>) -> Self {
        Self {
            inner: AuthBackend::InMemory(state),
        }
    }

    /// Sign in with email and password.
    ///
    /// Fails with `InvalidCredentials` when the provider rejects the pair,
    /// `Network` on transport failure.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        match &self.inner {
            AuthBackend::Http(http) => http.sign_in(email, password).await,
            AuthBackend::InMemory(mem) => mem.sign_in(email, password),
        }
    }

    /// Register a new account. No profile is created by this call.
    ///
    /// Fails with `AccountExists` or `Validation` as reported by the
    /// provider (weak password, malformed email).
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AppError> {
        match &self.inner {
            AuthBackend::Http(http) => http.sign_up(email, password).await,
            AuthBackend::InMemory(mem) => mem.sign_up(email, password),
        }
    }

    /// Invalidate the session server-side.
    ///
    /// Fails with `Network` only; callers clear local session state
    /// regardless of the outcome.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        match &self.inner {
            AuthBackend::Http(http) => http.sign_out(access_token).await,
            AuthBackend::InMemory(mem) => mem.sign_out(access_token),
        }
    }

    /// Exchange a refresh token for a new session. The refresh token is
    /// rotated: the old one is invalid afterwards.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        match &self.inner {
            AuthBackend::Http(http) => http.refresh_session(refresh_token).await,
            AuthBackend::InMemory(mem) => mem.refresh_session(refresh_token),
        }
    }

    /// The identity behind a valid access token, or `None` when the token
    /// no longer proves a session. Only transport failures are errors.
    pub async fn get_user(&self, access_token: &str) -> Result<Option<Identity>, AppError> {
        match &self.inner {
            AuthBackend::Http(http) => http.get_user(access_token).await,
            AuthBackend::InMemory(mem) => mem.get_user(access_token),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP mode
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct HttpAuth {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Token grant response from the provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(|| Utc::now() + Duration::seconds(self.expires_in.unwrap_or(3600)));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// User object from the provider's user endpoint.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    email: String,
}

/// Error body from the provider's auth endpoints.
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

impl AuthErrorBody {
    fn message(&self) -> String {
        self.error_description
            .clone()
            .or_else(|| self.msg.clone())
            .unwrap_or_else(|| "provider error".to_string())
    }
}

impl HttpAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let url = format!("{}/token?grant_type=password", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        if response.status().is_client_error() {
            return Err(AppError::InvalidCredentials);
        }
        let body: TokenResponse = Self::read_json(response).await?;
        Ok(body.into_session())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let url = format!("{}/signup", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        if response.status().is_client_error() {
            let body: AuthErrorBody = response.json().await.unwrap_or_default();
            let message = body.message();
            let lowered = message.to_lowercase();
            if lowered.contains("already") {
                return Err(AppError::AccountExists);
            }
            return Err(AppError::Validation(message));
        }
        let body: TokenResponse = Self::read_json(response).await?;
        Ok(body.into_session())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let url = format!("{}/logout", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        // A rejected token means the session is already gone server-side.
        if response.status().is_server_error() {
            return Err(AppError::Network(format!("HTTP {}", response.status())));
        }
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        let url = format!("{}/token?grant_type=refresh_token", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Session refresh request failed: {}", e)))?;

        if response.status().is_client_error() {
            // Revoked or already-rotated refresh token.
            return Err(AppError::InvalidCredentials);
        }
        let body: TokenResponse = Self::read_json(response).await?;
        Ok(body.into_session())
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<Identity>, AppError> {
        let url = format!("{}/user", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        if response.status().is_client_error() {
            return Ok(None);
        }
        let user: ProviderUser = Self::read_json(response).await?;

        // The user endpoint attests the token; session timestamps come from
        // the token's own claims when a caller needs them.
        Ok(Some(Identity {
            id: user.id,
            email: user.email,
            issued_at: Utc::now(),
            expires_at: Utc::now(),
        }))
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Network(format!("HTTP {}: {}", status, body)));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Network(format!("JSON parse error: {}", e)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory mode
// ─────────────────────────────────────────────────────────────────────────────

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone)]
struct StoredUser {
    id: String,
    email: String,
    password: String,
}

#[derive(Debug, Clone)]
struct StoredSession {
    user_id: String,
}

/// Process-local identity provider implementing the [`AuthClient`] contract.
///
/// Mints real HS256 session tokens so the gateway's verification path is
/// exercised end to end. Failure toggles simulate provider outages.
pub struct InMemoryAuth {
    jwt_secret: Vec<u8>,
    token_ttl_secs: AtomicI64,
    users: DashMap<String, StoredUser>,
    sessions: DashMap<String, StoredSession>,
    refresh_calls: AtomicU64,
    fail_sign_out: AtomicBool,
    fail_refresh: AtomicBool,
    fail_get_user: AtomicBool,
}

impl InMemoryAuth {
    pub fn new(jwt_secret: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            jwt_secret: jwt_secret.into(),
            token_ttl_secs: AtomicI64::new(3600),
            users: DashMap::new(),
            sessions: DashMap::new(),
            refresh_calls: AtomicU64::new(0),
            fail_sign_out: AtomicBool::new(false),
            fail_refresh: AtomicBool::new(false),
            fail_get_user: AtomicBool::new(false),
        })
    }

    // ─── Test hooks ──────────────────────────────────────────────

    /// Lifetime of newly minted access tokens. Negative values mint
    /// already-expired tokens.
    pub fn set_token_ttl_secs(&self, secs: i64) {
        self.token_ttl_secs.store(secs, Ordering::SeqCst);
    }

    /// Number of refresh grants attempted so far.
    pub fn refresh_calls(&self) -> u64 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Make sign-out fail with a network error.
    pub fn set_fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Make refresh fail with a network error.
    pub fn set_fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    /// Make current-user lookup fail with a network error.
    pub fn set_fail_get_user(&self, fail: bool) {
        self.fail_get_user.store(fail, Ordering::SeqCst);
    }

    /// Revoke every live refresh token (simulates server-side invalidation).
    pub fn revoke_all_sessions(&self) {
        self.sessions.clear();
    }

    // ─── Contract ────────────────────────────────────────────────

    fn sign_up(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("email address is invalid".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.users.contains_key(&email) {
            return Err(AppError::AccountExists);
        }

        let user = StoredUser {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.clone(),
            password: password.to_string(),
        };
        let session = self.open_session(&user)?;
        self.users.insert(email, user);
        Ok(session)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .get(&email)
            .ok_or(AppError::InvalidCredentials)?;
        if user.password != password {
            return Err(AppError::InvalidCredentials);
        }
        self.open_session(&user)
    }

    fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AppError::Network("sign-out unavailable".to_string()));
        }
        if let Ok(claims) = verify_session_token(access_token, &self.jwt_secret) {
            self.sessions.retain(|_, s| s.user_id != claims.sub);
        }
        Ok(())
    }

    fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(AppError::Network("refresh unavailable".to_string()));
        }

        // Rotation: the presented token is consumed whether or not a new
        // session can be opened.
        let stored = self
            .sessions
            .remove(refresh_token)
            .map(|(_, s)| s)
            .ok_or(AppError::InvalidCredentials)?;

        let user = self
            .users
            .iter()
            .find(|u| u.id == stored.user_id)
            .map(|u| u.value().clone())
            .ok_or(AppError::InvalidCredentials)?;
        self.open_session(&user)
    }

    fn get_user(&self, access_token: &str) -> Result<Option<Identity>, AppError> {
        if self.fail_get_user.load(Ordering::SeqCst) {
            return Err(AppError::Network("user lookup unavailable".to_string()));
        }

        let claims = match verify_session_token(access_token, &self.jwt_secret) {
            Ok(claims) => claims,
            Err(_) => return Ok(None),
        };
        if claims.is_expired_at(Utc::now()) {
            return Ok(None);
        }
        if !self.users.iter().any(|u| u.id == claims.sub) {
            return Ok(None);
        }
        Ok(Some(claims.identity()))
    }

    fn open_session(&self, user: &StoredUser) -> Result<Session, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.token_ttl_secs.load(Ordering::SeqCst));
        let access_token =
            issue_session_token(&user.id, &user.email, now, expires_at, &self.jwt_secret)
                .map_err(AppError::Internal)?;
        let refresh_token = uuid::Uuid::new_v4().to_string();

        self.sessions.insert(
            refresh_token.clone(),
            StoredSession {
                user_id: user.id.clone(),
            },
        );

        Ok(Session {
            access_token,
            refresh_token,
            expires_at,
        })
    }
}
