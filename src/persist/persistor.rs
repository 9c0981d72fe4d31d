//! Write-through persistence of the preferences slice.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::slice::{restore_or_default, snapshot, Preferences, ROOT_KEY};
use super::storage::{KeyValueStorage, NoopStorage};
use crate::error::StorageError;

struct State {
  preferences: Preferences,
  storage: Arc<dyn KeyValueStorage>,
}

/// Owns the persisted preferences for one session.
///
/// Built once through [`Persistor::rehydrate`]; every later change is written
/// straight back to storage. If storage misbehaves the session carries on in
/// memory only.
pub struct Persistor {
  state: Mutex<State>,
  // Held across a write so snapshots reach storage in the order they were taken.
  writer: tokio::sync::Mutex<()>,
}

impl Persistor {
  /// Read the stored snapshot once, waiting at most `timeout`.
  ///
  /// Never fails: a missing snapshot yields defaults, a corrupt one is
  /// discarded, and a storage error or timeout switches to in-memory mode.
  pub async fn rehydrate(storage: Arc<dyn KeyValueStorage>, timeout: Duration) -> Self {
    let reader = Arc::clone(&storage);
    let read = tokio::task::spawn_blocking(move || reader.get_item(ROOT_KEY));

    let (preferences, storage) = match tokio::time::timeout(timeout, read).await {
      Ok(Ok(Ok(Some(bytes)))) => (restore_or_default(&bytes), storage),
      Ok(Ok(Ok(None))) => {
        debug!("no persisted state, using defaults");
        (Preferences::default(), storage)
      }
      Ok(Ok(Err(err))) => {
        warn!(error = %err, "persisted state unavailable, continuing in memory");
        (Preferences::default(), Self::fallback())
      }
      Ok(Err(err)) => {
        warn!(error = %err, "rehydration task failed, continuing in memory");
        (Preferences::default(), Self::fallback())
      }
      Err(_) => {
        warn!(?timeout, "rehydration timed out, continuing in memory");
        (Preferences::default(), Self::fallback())
      }
    };
    info!(durable = storage.is_durable(), "rehydrated preferences");

    Self {
      state: Mutex::new(State {
        preferences,
        storage,
      }),
      writer: tokio::sync::Mutex::new(()),
    }
  }

  fn fallback() -> Arc<dyn KeyValueStorage> {
    Arc::new(NoopStorage)
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn preferences(&self) -> Preferences {
    self.lock().preferences.clone()
  }

  /// Whether changes currently reach durable storage.
  pub fn is_durable(&self) -> bool {
    self.lock().storage.is_durable()
  }

  /// Apply `f` to the preferences and write the result through.
  ///
  /// The new value is visible through [`preferences`](Self::preferences)
  /// immediately. The storage write runs on a blocking thread; unchanged
  /// preferences are not written at all.
  pub async fn update(&self, f: impl FnOnce(&mut Preferences)) -> Preferences {
    let _writer = self.writer.lock().await;
    let (preferences, storage) = {
      let mut state = self.lock();
      let before = state.preferences.clone();
      f(&mut state.preferences);
      if state.preferences == before {
        return before;
      }
      (state.preferences.clone(), Arc::clone(&state.storage))
    };

    if let Err(err) = Self::write(storage, &preferences).await {
      warn!(error = %err, "failed to persist preferences, continuing in memory");
      self.lock().storage = Self::fallback();
    }
    preferences
  }

  async fn write(
    storage: Arc<dyn KeyValueStorage>,
    preferences: &Preferences,
  ) -> Result<(), StorageError> {
    let bytes = snapshot(preferences)?;
    tokio::task::spawn_blocking(move || storage.set_item(ROOT_KEY, &bytes))
      .await
      .map_err(|e| StorageError(format!("Failed to run storage write: {}", e)))?
  }

  pub async fn set_sidebar_collapsed(&self, collapsed: bool) -> Preferences {
    self.update(|p| p.is_sidebar_collapsed = collapsed).await
  }

  pub async fn set_dark_mode(&self, dark: bool) -> Preferences {
    self.update(|p| p.is_dark_mode = dark).await
  }

  pub async fn set_notification_on(&self, on: bool) -> Preferences {
    self.update(|p| p.is_notification_on = on).await
  }
}
