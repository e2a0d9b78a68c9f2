use thiserror::Error;

use mconnect_shared::ValidationError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the access token (HTTP 401 or "Invalid token").
    #[error("Session expired. Please login again.")]
    InvalidToken,

    #[error("Please log in to continue.")]
    NotLoggedIn,

    #[error("Session expired. Please log in again.")]
    SessionExpired,

    /// The backend answered with a non-zero code. `message` is already
    /// translated for the operator.
    #[error("{message}")]
    Api { code: i64, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Device {0} is already registered or bound. Please choose another device.")]
    SerialUnavailable(String),
}

impl ClientError {
    /// Errors that end the whole operator session, not just one call.
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken | Self::NotLoggedIn | Self::SessionExpired
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
