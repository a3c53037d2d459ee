//! Error types for autoagent

use thiserror::Error;

/// The main error type for autoagent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Unreadable configuration file
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Persistent storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Input rejected before any state change or network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation refused because it would break a store invariant
    #[error("Rejected: {0}")]
    Rejected(String),

    /// A chat request is already pending for the conversation
    #[error("Conversation {0} already has a request in flight")]
    Busy(String),

    /// Request failed before the backend produced a response
    #[error("Network error: {0}")]
    Transport(String),

    /// The backend answered with an error payload
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized Result type for autoagent operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for errors raised by the user's input rather than the environment
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Rejected(_) | Error::Busy(_) | Error::NotFound(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
