// SPDX-License-Identifier: MIT

//! Client-side session state.
//!
//! [`SessionController`] is the identity-aware counterpart of a signed-in
//! header or navigation view: it owns the current session, resolves the
//! identity behind it, and exposes a three-state view so callers can tell
//! "still loading" apart from "anonymous". A boolean plus nullable identity
//! cannot express that distinction; the enum makes it structural.

use crate::error::AppError;
use crate::models::{Identity, Session};
use crate::provider::AuthClient;

/// What the UI may currently assume about the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Identity resolution is in flight; show neither view yet.
    Loading,
    Authenticated(Identity),
    Anonymous,
}

/// Holds the session for one client and keeps its state consistent with
/// the provider's answers.
pub struct SessionController {
    auth: AuthClient,
    session: Option<Session>,
    state: SessionState,
}

impl SessionController {
    pub fn new(auth: AuthClient) -> Self {
        Self {
            auth,
            session: None,
            state: SessionState::Loading,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The current session, if one is held.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Resolve the identity behind the held session.
    ///
    /// Every failure path lands on `Anonymous`: a stale authenticated view
    /// is worse than asking the user to sign in again. The error itself is
    /// logged for diagnostics.
    pub async fn load(&mut self) {
        let Some(session) = &self.session else {
            self.state = SessionState::Anonymous;
            return;
        };

        match self.auth.get_user(&session.access_token).await {
            Ok(Some(identity)) => {
                self.state = SessionState::Authenticated(identity);
            }
            Ok(None) => {
                self.session = None;
                self.state = SessionState::Anonymous;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Session load failed, treating as anonymous");
                self.state = SessionState::Anonymous;
            }
        }
    }

    /// Sign in and resolve the resulting identity.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), AppError> {
        let session = self.auth.sign_in(email, password).await?;
        self.session = Some(session);
        self.load().await;
        Ok(())
    }

    /// Register and resolve the resulting identity.
    pub async fn sign_up(&mut self, email: &str, password: &str) -> Result<(), AppError> {
        let session = self.auth.sign_up(email, password).await?;
        self.session = Some(session);
        self.load().await;
        Ok(())
    }

    /// Sign out. Local state is cleared unconditionally: a user-initiated
    /// logout must never be contradicted by a failed remote call.
    pub async fn sign_out(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(err) = self.auth.sign_out(&session.access_token).await {
                tracing::warn!(error = %err, "Remote sign-out failed, clearing local session anyway");
            }
        }
        self.state = SessionState::Anonymous;
    }
}
