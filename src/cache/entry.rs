//! Cache entries and the partial updates applied to them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::traits::Fingerprint;
use crate::error::ErrorInfo;

/// Fetch status of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
  Uninitialized,
  Loading,
  Success,
  Error,
}

/// Snapshot of one cached resource.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub fingerprint: Fingerprint,
  pub status: Status,
  /// Set by invalidation. Data stays servable until a refetch lands.
  pub stale: bool,
  pub data: Option<Arc<Value>>,
  pub error: Option<ErrorInfo>,
  pub last_updated: DateTime<Utc>,
  pub subscriber_count: usize,
  /// Sequence number of the request whose response will be accepted.
  pub pending: Option<u64>,
  /// Store-wide counter, bumped on every observable change.
  pub revision: u64,
}

impl CacheEntry {
  pub(crate) fn new(fingerprint: Fingerprint, now: DateTime<Utc>) -> Self {
    Self {
      fingerprint,
      status: Status::Uninitialized,
      stale: false,
      data: None,
      error: None,
      last_updated: now,
      subscriber_count: 0,
      pending: None,
      revision: 0,
    }
  }

  /// Whether a read should go to the network.
  pub fn needs_fetch(&self) -> bool {
    self.status == Status::Uninitialized || self.stale
  }

  /// No request outstanding; the entry will not change on its own.
  pub fn is_settled(&self) -> bool {
    self.pending.is_none()
  }
}

/// Partial update merged by [`CacheStore::upsert`](super::CacheStore::upsert).
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
  pub status: Option<Status>,
  pub data: Option<Arc<Value>>,
  /// `Some(None)` clears a previous error.
  pub error: Option<Option<ErrorInfo>>,
  pub stale: Option<bool>,
}

impl EntryPatch {
  pub fn loading() -> Self {
    Self {
      status: Some(Status::Loading),
      ..Self::default()
    }
  }

  pub fn success(data: Value) -> Self {
    Self {
      status: Some(Status::Success),
      data: Some(Arc::new(data)),
      error: Some(None),
      stale: Some(false),
    }
  }

  /// Keeps previously cached data so the caller can still show it.
  pub fn failure(error: ErrorInfo) -> Self {
    Self {
      status: Some(Status::Error),
      data: None,
      error: Some(Some(error)),
      stale: Some(false),
    }
  }

  pub fn stale() -> Self {
    Self {
      stale: Some(true),
      ..Self::default()
    }
  }

  /// Merge into `entry`. Returns whether anything observable changed.
  pub(crate) fn apply(self, entry: &mut CacheEntry, now: DateTime<Utc>) -> bool {
    let mut touched = false;
    let mut changed = false;

    if let Some(status) = self.status {
      if entry.status != status {
        entry.status = status;
        touched = true;
      }
    }
    if let Some(data) = self.data {
      entry.data = Some(data);
      touched = true;
    }
    if let Some(error) = self.error {
      if entry.error != error {
        entry.error = error;
        changed = true;
      }
    }
    if let Some(stale) = self.stale {
      if entry.stale != stale {
        entry.stale = stale;
        changed = true;
      }
    }

    if touched {
      entry.last_updated = now;
    }
    touched || changed
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::traits::{Params, ResourceTag};
  use serde_json::json;

  fn entry() -> CacheEntry {
    let fp = Fingerprint::new("Products", ResourceTag::new("Products"), Params::new());
    CacheEntry::new(fp, Utc::now())
  }

  #[test]
  fn test_success_clears_error_and_stale() {
    let mut e = entry();
    let now = Utc::now();
    EntryPatch::failure(ErrorInfo {
      kind: crate::error::ErrorKind::Parse,
      message: "bad".into(),
      retryable: false,
    })
    .apply(&mut e, now);
    e.stale = true;

    assert!(EntryPatch::success(json!([1])).apply(&mut e, now));
    assert_eq!(e.status, Status::Success);
    assert!(e.error.is_none());
    assert!(!e.stale);
    assert_eq!(e.data.as_deref(), Some(&json!([1])));
  }

  #[test]
  fn test_stale_patch_is_idempotent() {
    let mut e = entry();
    let before = e.last_updated;
    assert!(EntryPatch::stale().apply(&mut e, Utc::now()));
    assert!(!EntryPatch::stale().apply(&mut e, Utc::now()));
    // Staleness alone is not a data/status change.
    assert_eq!(e.last_updated, before);
  }

  #[test]
  fn test_needs_fetch() {
    let mut e = entry();
    assert!(e.needs_fetch());
    EntryPatch::success(json!([])).apply(&mut e, Utc::now());
    assert!(!e.needs_fetch());
    EntryPatch::stale().apply(&mut e, Utc::now());
    assert!(e.needs_fetch());
  }
}
