use thiserror::Error;

use mconnect_client::ClientError;
use mconnect_shared::{DepartmentId, ValidationError};

/// Failures that stop a whole synchronization. Per-community failures are
/// not errors; they are part of the [`Outcome`](crate::Outcome).
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Community IDs not configured properly for this page ({0}).")]
    NoCommunities(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Selected department has no name. Can't match across communities.")]
    HomeDepartmentUnresolved,

    /// The selected department is not in the home community's catalog.
    #[error("Please select a valid department from the dropdown.")]
    UnknownDepartment(DepartmentId),

    /// The token was rejected or the session ended. The caller must force
    /// re-authentication.
    #[error(transparent)]
    Session(ClientError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl SyncError {
    pub fn is_session_failure(&self) -> bool {
        matches!(self, Self::Session(_))
    }

    /// Session failures escalate, anything else is unexpected at this level.
    pub(crate) fn from_client(err: ClientError) -> Self {
        if err.is_session_failure() {
            Self::Session(err)
        } else {
            Self::Unexpected(err.to_string())
        }
    }
}
