//! Error types for FreeIPA directory operations.
//!
//! Errors fall into two classes. Connection-class errors (connect, bind, timeout) are fatal and
//! surface when a server handle is constructed. Query-class errors describe a single failed search;
//! the client reports them and degrades the affected read to an empty or absent result.

use thiserror::Error;

/// Main error type for FreeIPA directory operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The transport could not reach the server or negotiate TLS
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The server rejected the bind credentials
    #[error("Bind failed: {0}")]
    BindFailed(String),

    /// Connecting or binding to the server timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A directory search failed
    #[error("Search under `{base}` failed: {message}")]
    SearchFailed {
        /// Base DN of the failed search
        base: String,
        /// Transport-provided description
        message: String,
    },

    /// A distinguished name could not be parsed
    #[error("Invalid distinguished name: {0}")]
    InvalidDn(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A value required to issue a request has not been resolved
    #[error("Not resolved: {0}")]
    NotResolved(String),
}

/// Specialized result type for FreeIPA directory operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::BindFailed(_) => "BIND_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::SearchFailed { .. } => "SEARCH_FAILED",
            Self::InvalidDn(_) => "INVALID_DN",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::NotResolved(_) => "NOT_RESOLVED",
        }
    }

    /// Returns true for connection-class errors, which leave no usable handle behind.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::BindFailed(_) | Self::Timeout(_)
        )
    }

    /// Builds a [`Error::SearchFailed`] for the given base DN.
    #[must_use]
    pub fn search_failed(base: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SearchFailed {
            base: base.into(),
            message: message.into(),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
