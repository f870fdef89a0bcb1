//! Error types for `relvec`.
//!
//! Every failure surfaced by the filter compiler, the statement builder, the
//! result mapper or the store itself is one variant of [`Error`]. Errors are
//! raised as early as possible: anything detectable without touching the
//! database is reported before a statement is executed.

use thiserror::Error;

/// Result type alias for `relvec` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `relvec` operations.
///
/// Error codes follow the pattern `RELVEC-XXX` for easy debugging.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed filter shape, wrong arity or type, bad identifier or key (RELVEC-001).
    #[error("[RELVEC-001] Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown comparator or logical tag in a filter (RELVEC-002).
    #[error("[RELVEC-002] Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Invalid store configuration (RELVEC-003).
    ///
    /// Raised at construction time: unsupported distance strategy, missing
    /// model identifier for internal embeddings, failed embedding probe.
    #[error("[RELVEC-003] Configuration error: {0}")]
    Configuration(String),

    /// A row returned by the store could not be decoded (RELVEC-004).
    #[error("[RELVEC-004] Decode error: {0}")]
    Decode(String),

    /// The store rejected a statement (RELVEC-005).
    ///
    /// The message is the store's own, unmodified.
    #[error("[RELVEC-005] Execution error: {0}")]
    Execution(String),

    /// The external embedding capability failed (RELVEC-006).
    #[error("[RELVEC-006] Embedding error: {0}")]
    Embedding(String),
}

impl Error {
    /// Returns the error code (e.g., "RELVEC-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "RELVEC-001",
            Self::UnsupportedOperator(_) => "RELVEC-002",
            Self::Configuration(_) => "RELVEC-003",
            Self::Decode(_) => "RELVEC-004",
            Self::Execution(_) => "RELVEC-005",
            Self::Embedding(_) => "RELVEC-006",
        }
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// Caller-side mistakes and decode failures are deterministic; only
    /// failures of the store or of the embedding model are worth retrying.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Execution(_) | Self::Embedding(_))
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
