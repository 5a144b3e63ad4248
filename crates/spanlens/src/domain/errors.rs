//! Domain-specific errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("no definition starts on line {0}")]
    NoSpanOnLine(usize),
    #[error("no definition named '{0}'")]
    UnknownSpan(String),
    #[error("nothing is selected")]
    NoSelection,
    #[error("no file loaded; upload the source first")]
    NoFileLoaded,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Failures reported by the annotation and file service.
///
/// `Clone` so a single in-flight request can hand the same failure to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("request rejected: {0}")]
    Validation(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    Decode(String),
}
