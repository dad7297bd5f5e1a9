//! Shared error type across routemetrics crates.

use thiserror::Error;

/// Coarse error classes (stable API, used in logs and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Naming collision, invalid name, bad configuration. Fatal for the
    /// affected instrumentation.
    Configuration,
    /// Metrics backend refused an operation for a reason other than naming.
    Backend,
    /// Internal invariant broken.
    Internal,
}

impl ErrorKind {
    /// String representation used in structured logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "CONFIGURATION",
            ErrorKind::Backend => "BACKEND",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by core and the axum integration.
///
/// `Clone` so a failed registration can be cached and replayed to every later
/// request of the same endpoint without touching the backend again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
    #[error("duplicate metric name: {0}")]
    DuplicateName(String),
    #[error("invalid metric name: {0}")]
    InvalidName(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("backend: {0}")]
    Backend(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricsError {
    /// Map to a stable error class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetricsError::DuplicateName(_)
            | MetricsError::InvalidName(_)
            | MetricsError::BadConfig(_) => ErrorKind::Configuration,
            MetricsError::Backend(_) => ErrorKind::Backend,
            MetricsError::Internal(_) => ErrorKind::Internal,
        }
    }
}
