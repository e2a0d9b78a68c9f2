use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use mconnect_client::ClientError;
use mconnect_store::StoreError;
use mconnect_sync::SyncError;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Superseded by a newer query")]
    Superseded,
}

impl ConsoleError {
    pub fn is_session_failure(&self) -> bool {
        match self {
            Self::Client(e) => e.is_session_failure(),
            Self::Sync(e) => e.is_session_failure(),
            _ => false,
        }
    }
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            e if e.is_session_failure() => (StatusCode::UNAUTHORIZED, self.to_string()),
            ConsoleError::Client(ClientError::Validation(_))
            | ConsoleError::Sync(SyncError::Invalid(_))
            | ConsoleError::Sync(SyncError::NoCommunities(_))
            | ConsoleError::Sync(SyncError::HomeDepartmentUnresolved)
            | ConsoleError::Sync(SyncError::UnknownDepartment(_))
            | ConsoleError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ConsoleError::Client(ClientError::SerialUnavailable(_)) | ConsoleError::Superseded => {
                (StatusCode::CONFLICT, self.to_string())
            }
            ConsoleError::Client(ClientError::Api { .. }) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            ConsoleError::Client(_) => (StatusCode::BAD_GATEWAY, "Cloud API unavailable".to_string()),
            ConsoleError::Sync(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.".to_string(),
            ),
            ConsoleError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
