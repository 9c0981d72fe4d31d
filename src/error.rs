//! Error taxonomy for the sync layer.
//!
//! Fetch failures never escape a query: they are folded into the cache entry as
//! an [`ErrorInfo`]. Storage and restore failures are recovered inside the
//! persistence adapter. Only mutations and registry lookups return errors to
//! the caller.

use serde::Serialize;
use thiserror::Error;

/// Failure of a single network exchange with the remote service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
  /// Service unreachable, connection reset, or timed out.
  #[error("network error: {0}")]
  Network(String),
  /// The service answered with a non-success status code.
  #[error("http error {status}: {message}")]
  Http { status: u16, message: String },
  /// The response body did not match the resource schema.
  #[error("parse error: {0}")]
  Parse(String),
}

impl FetchError {
  /// Whether repeating the same request could plausibly succeed.
  pub fn is_retryable(&self) -> bool {
    match self {
      FetchError::Network(_) => true,
      FetchError::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
      FetchError::Parse(_) => false,
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      FetchError::Network(_) => ErrorKind::Network,
      FetchError::Http { status, .. } => ErrorKind::Http { status: *status },
      FetchError::Parse(_) => ErrorKind::Parse,
    }
  }
}

/// Classification stored on a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ErrorKind {
  Network,
  Http { status: u16 },
  Parse,
}

/// Error details surfaced to the rendering layer through a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
  pub kind: ErrorKind,
  pub message: String,
  pub retryable: bool,
}

impl From<&FetchError> for ErrorInfo {
  fn from(err: &FetchError) -> Self {
    Self {
      kind: err.kind(),
      message: err.to_string(),
      retryable: err.is_retryable(),
    }
  }
}

/// Durable storage could not be read or written.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("storage error: {0}")]
pub struct StorageError(pub String);

/// A persisted snapshot exists but cannot be decoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("corrupt persisted state: {0}")]
pub struct RestoreError(pub String);

/// Errors returned by the fetch coordinator to its callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error("unknown resource '{0}'")]
  UnknownResource(String),
  #[error("unknown mutation '{0}'")]
  UnknownMutation(String),
  #[error(transparent)]
  Fetch(#[from] FetchError),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_retryable_classification() {
    assert!(FetchError::Network("timed out".into()).is_retryable());
    assert!(FetchError::Http {
      status: 503,
      message: "unavailable".into()
    }
    .is_retryable());
    assert!(FetchError::Http {
      status: 429,
      message: "slow down".into()
    }
    .is_retryable());
    assert!(!FetchError::Http {
      status: 404,
      message: "missing".into()
    }
    .is_retryable());
    assert!(!FetchError::Parse("expected array".into()).is_retryable());
  }

  #[test]
  fn test_error_info_from_fetch_error() {
    let info = ErrorInfo::from(&FetchError::Http {
      status: 500,
      message: "boom".into(),
    });
    assert_eq!(info.kind, ErrorKind::Http { status: 500 });
    assert!(info.retryable);
    assert_eq!(info.message, "http error 500: boom");
  }
}
