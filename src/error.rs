// Error taxonomy for the synchronization client

use thiserror::Error;

/// Failures surfaced by the client.
///
/// Validation errors are caught before any request is sent. Transport and
/// server errors are never fatal; loops log them and keep going, and a failed
/// user command simply has to be re-submitted.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl ClientError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }

    /// Text suitable for direct display: the server's own message when it
    /// sent one, otherwise the caller's fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Validation(message) => message.clone(),
            ClientError::Server { message, .. } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}
