use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("authentication required")]
    Unauthorized { message: Option<String> },

    #[error("backend returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("image service error: {0}")]
    ImageService(String),
}

impl ClientError {
    /// Message the backend attached to the failure, when there is one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ClientError::Unauthorized { message } => message.as_deref(),
            ClientError::Status { message, .. } => Some(message),
            ClientError::ImageService(message) => Some(message),
            ClientError::Transport(_) | ClientError::Decode(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }
}
