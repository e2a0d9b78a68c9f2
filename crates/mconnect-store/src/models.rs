//! Records persisted in the local database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The operator session as it was handed out by the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredSession {
    /// Bearer token sent as `accessToken` on every cloud call.
    pub access_token: String,
    /// The `expiresIn` value of the login response. Despite the name it is
    /// the issue timestamp; expiry is computed from it.
    pub issued_at: DateTime<Utc>,
    /// Operator login name, for display only.
    pub username: String,
}

pub use mconnect_shared::LastSeenMap;
