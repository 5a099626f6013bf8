//! Error types for the drive_client crate.

use thiserror::Error;

/// Failure of a single request action, classified where the HTTP call is made.
///
/// `Api` is the only variant that carries a service status code and the only
/// one the retry loop ever considers retrying.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("JWT encoding error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),
}

impl RequestError {
    /// Status code reported by the remote service, if this is a service error.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors surfaced by [`DriveClient`](crate::DriveClient) operations.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to read credentials file: {0}")]
    CredentialsFile(#[from] std::io::Error),

    #[error("Failed to parse credentials JSON: {0}")]
    CredentialsParse(#[from] serde_json::Error),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Drive API error ({context}): {source}")]
    RemoteService {
        context: String,
        #[source]
        source: RequestError,
    },

    #[error("Unexpected error ({context}): {source}")]
    Unexpected {
        context: String,
        #[source]
        source: RequestError,
    },

    #[error("Drive API failed after {attempts} attempts ({context}): {source}")]
    RetriesExhausted {
        context: String,
        attempts: u32,
        #[source]
        source: RequestError,
    },
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
