//! Operator session.
//!
//! A [`Session`] is passed explicitly to every cloud call. The
//! [`SessionHolder`] is the single owner of the current session: it is set at
//! login and cleared at logout, on expiry, and whenever the backend rejects
//! the token.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use mconnect_shared::constants::DEFAULT_SESSION_MAX_AGE_SECS;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    #[serde(skip_serializing)]
    access_token: String,
    issued_at: DateTime<Utc>,
    username: String,
}

impl Session {
    /// Build a session from a login response. Blank tokens and the literal
    /// strings `"null"` / `"undefined"` are refused.
    pub fn new(
        access_token: impl Into<String>,
        issued_at: DateTime<Utc>,
        username: impl Into<String>,
    ) -> Result<Self> {
        let access_token = access_token.into();
        let token = access_token.trim();
        if token.is_empty() || token == "null" || token == "undefined" {
            return Err(ClientError::NotLoggedIn);
        }
        Ok(Self {
            access_token: token.to_string(),
            issued_at,
            username: username.into(),
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.issued_at > max_age
    }
}

/// Shared handle to the one current session.
#[derive(Debug, Clone)]
pub struct SessionHolder {
    current: Arc<RwLock<Option<Session>>>,
    max_age: Duration,
}

impl Default for SessionHolder {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_SESSION_MAX_AGE_SECS))
    }
}

impl SessionHolder {
    pub fn new(max_age: Duration) -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            max_age,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub async fn set(&self, session: Session) {
        info!(user = %session.username, issued_at = %session.issued_at, "Session started");
        *self.current.write().await = Some(session);
    }

    pub async fn clear(&self) -> Option<Session> {
        let previous = self.current.write().await.take();
        if let Some(ref s) = previous {
            info!(user = %s.username, "Session cleared");
        }
        previous
    }

    /// The live session. An expired one is dropped on the spot.
    pub async fn current(&self) -> Result<Session> {
        self.current_at(Utc::now()).await
    }

    pub async fn current_at(&self, now: DateTime<Utc>) -> Result<Session> {
        let session = self
            .current
            .read()
            .await
            .clone()
            .ok_or(ClientError::NotLoggedIn)?;

        if session.is_expired_at(now, self.max_age) {
            warn!(user = %session.username, "Session expired");
            self.clear().await;
            return Err(ClientError::SessionExpired);
        }
        Ok(session)
    }

    /// Clear the session if `err` is a session failure. Returns whether it was.
    pub async fn escalate(&self, err: &ClientError) -> bool {
        if !err.is_session_failure() {
            return false;
        }
        warn!(error = %err, "Session failure, forcing re-authentication");
        self.clear().await;
        true
    }
}
