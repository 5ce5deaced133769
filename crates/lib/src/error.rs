//! Error types for the conversation core.
//!
//! Each variant maps to one HTTP status on the control plane; the inbound
//! router only logs them.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing caller input.
    #[error("{0}")]
    Validation(String),

    /// No matching contact, or no conversation for the contact.
    #[error("{0}")]
    NotFound(String),

    /// Messaging transport failure (import, send, connect).
    #[error("transport error: {0}")]
    Transport(String),

    /// Completion backend failure or timeout.
    #[error("completion error: {0}")]
    Completion(String),

    /// Reserved for duplicate-session guards.
    #[error("{0}")]
    Conflict(String),
}

impl Error {
    pub fn transport(e: impl std::fmt::Display) -> Self {
        Error::Transport(e.to_string())
    }

    pub fn completion(e: impl std::fmt::Display) -> Self {
        Error::Completion(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Completion(e.to_string())
    }
}
