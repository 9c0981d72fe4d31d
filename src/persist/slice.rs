//! The whitelisted slice of client state that survives restarts.
//!
//! Only UI preferences are persisted. Cached remote data is never written
//! here; it is always rebuilt from the network.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RestoreError, StorageError};

/// Storage key every snapshot is written under.
pub const ROOT_KEY: &str = "persist:root";

/// UI preferences of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
  pub is_sidebar_collapsed: bool,
  pub is_dark_mode: bool,
  pub is_notification_on: bool,
}

impl Default for Preferences {
  fn default() -> Self {
    Self {
      is_sidebar_collapsed: false,
      is_dark_mode: false,
      is_notification_on: true,
    }
  }
}

/// On-disk layout: one object keyed by slice name.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct PersistedSlice {
  global: Preferences,
}

/// Serialize the whitelisted slice.
pub fn snapshot(preferences: &Preferences) -> Result<Vec<u8>, StorageError> {
  let slice = PersistedSlice {
    global: preferences.clone(),
  };
  serde_json::to_vec(&slice).map_err(|e| StorageError(format!("Failed to serialize state: {}", e)))
}

/// Decode a snapshot.
///
/// Empty input means nothing was ever stored and yields defaults. Unknown
/// keys are ignored and missing keys take their default, so snapshots from
/// older or newer builds still load.
pub fn restore(bytes: &[u8]) -> Result<Preferences, RestoreError> {
  if bytes.iter().all(u8::is_ascii_whitespace) {
    return Ok(Preferences::default());
  }
  let slice: PersistedSlice =
    serde_json::from_slice(bytes).map_err(|e| RestoreError(e.to_string()))?;
  Ok(slice.global)
}

/// Like [`restore`], but falls back to defaults on corrupt input.
pub fn restore_or_default(bytes: &[u8]) -> Preferences {
  restore(bytes).unwrap_or_else(|err| {
    warn!(error = %err, "discarding persisted state");
    Preferences::default()
  })
}
