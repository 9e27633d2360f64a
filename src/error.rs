use thiserror::Error;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate and by service implementations.
///
/// Service-facing variants carry the human-readable message reported by the
/// backend. Controllers surface that message through their `error` state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Bad credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Role or ownership mismatch.
    #[error("not authorized: {0}")]
    Authorization(String),
    /// Resource or identity missing.
    #[error("not found: {0}")]
    NotFound(String),
    /// Malformed input.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Input collides with existing data, e.g. an email already registered.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Transport or service unavailable.
    #[error("network error: {0}")]
    Network(String),
    /// Local storage read or write failure.
    #[error("persistence error: {0}")]
    Persistence(String),
    /// Invalid identifier input.
    #[error("invalid id: {0}")]
    InvalidId(String),
    /// The operation needs a current identity and there is none.
    #[error("no authenticated identity")]
    NotAuthenticated,
    /// The owning component's lifetime ended before the operation completed.
    #[error("operation cancelled")]
    Cancelled,
    /// A newer request was issued before this one completed.
    #[error("superseded by a newer request")]
    Superseded,
}

impl Error {
    /// Returns the service-provided message, if there is a non-blank one.
    pub fn message(&self) -> Option<&str> {
        let message = match self {
            Self::Authentication(message)
            | Self::Authorization(message)
            | Self::NotFound(message)
            | Self::Validation(message)
            | Self::Conflict(message)
            | Self::Network(message)
            | Self::Persistence(message)
            | Self::InvalidId(message) => message.as_str(),
            Self::NotAuthenticated | Self::Cancelled | Self::Superseded => return None,
        };
        if message.trim().is_empty() {
            None
        } else {
            Some(message)
        }
    }

    /// Returns the service message or `fallback` when there is none.
    pub fn message_or(&self, fallback: &str) -> String {
        self.message().unwrap_or(fallback).to_string()
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Persistence(error.to_string())
    }
}
