use thiserror::Error;

use trellis_core::ApiError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status and (usually) a
    /// human-readable message.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("invalid response payload: {0}")]
    Decode(String),

    /// The session is gone: renewal failed or an authentication route
    /// rejected the credential.
    #[error("session expired")]
    Unauthorized,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { status, message } => ApiError::Status { status, message },
            ClientError::Unauthorized => ApiError::Unauthorized,
            other => ApiError::Transport(other.to_string()),
        }
    }
}
