//! Error taxonomy for the storefront client.
//!
//! Every failure a caller can observe is one of these variants; nothing
//! escapes as a panic or a raw transport error. The session manager
//! converts each variant into a human-readable message for the
//! presentation layer, and nothing here is retried automatically —
//! every retry is a fresh user action.

use thiserror::Error;

/// All failures surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure, timeout, or non-success HTTP status.
    #[error("network error: {0}")]
    Network(String),

    /// Remote responded, but not with the expected shape.
    #[error("malformed response from record store: {0}")]
    MalformedResponse(String),

    /// No stored record matched the supplied email/password pair.
    /// An expected user-facing outcome, not an exceptional condition.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The remote declined an insert; carries the server message when
    /// one was supplied.
    #[error("registration rejected: {0}")]
    RemoteRejection(String),

    /// Local session storage could not be read.
    #[error("failed to read session storage: {0}")]
    StorageRead(String),

    /// Local session storage could not be written or cleared.
    #[error("failed to write session storage: {0}")]
    StorageWrite(String),

    /// A required input field was empty (pre-network validation).
    #[error("please fill in all fields")]
    MissingField,
}

impl ClientError {
    /// Whether this outcome is part of normal user interaction
    /// (wrong password, blank form) rather than a fault.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::MissingField)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
