//! Client error types for the Datalayer SDK

use datalayer_common::ArgumentError;

/// Error type for Datalayer client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error("not authenticated: provide a token or credentials")]
    NotAuthenticated,

    #[error("auth failed: {0}")]
    AuthFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("server returned error: {0}")]
    Api(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("all servers failed")]
    AllServersFailed,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::NotFound(_) => Some(404),
            ClientError::RequestFailed { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Transport failures and server-side statuses worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ClientError::AllServersFailed => true,
            ClientError::RequestFailed { status, .. } => {
                *status >= 500 || *status == 409 || *status == 423
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
