//! Subscription handles for cached queries.
//!
//! Inspired by TanStack Query, a [`QueryHandle`] is what the rendering layer
//! holds on to: it exposes the current `{status, data, error}` of one cache
//! entry and lets the caller wait for changes.
//!
//! # Example
//!
//! ```ignore
//! let mut products = sync.query("Products", Params::new())?;
//!
//! // Render whatever is cached right now (possibly nothing yet)
//! render(products.state());
//!
//! // Re-render when the entry changes
//! while let Some(state) = products.changed().await {
//!     render(state);
//! }
//! ```
//!
//! Dropping the handle unsubscribes. A request that is still in flight keeps
//! running and its result is cached.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

use crate::cache::{reserialize, CacheEntry, FetchCoordinator, Fingerprint, Status, SubscriptionId};
use crate::error::{ErrorInfo, FetchError};

/// What the rendering layer sees of one cache entry.
#[derive(Debug, Clone)]
pub struct QueryState {
  pub status: Status,
  /// Last successfully fetched data, kept while refetching or after an error.
  pub data: Option<Arc<Value>>,
  pub error: Option<ErrorInfo>,
  pub is_stale: bool,
  /// A request for this entry is in flight.
  pub is_fetching: bool,
}

impl QueryState {
  /// First load: nothing to show yet.
  pub fn is_loading(&self) -> bool {
    self.is_fetching && self.data.is_none()
  }

  pub fn is_success(&self) -> bool {
    self.status == Status::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == Status::Error
  }

  pub fn data(&self) -> Option<&Value> {
    self.data.as_deref()
  }

  /// Decode the cached data into a concrete schema type.
  pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, FetchError> {
    self
      .data
      .as_deref()
      .map(|data| reserialize(data).map_err(|e| FetchError::Parse(e.to_string())))
      .transpose()
  }
}

impl From<&CacheEntry> for QueryState {
  fn from(entry: &CacheEntry) -> Self {
    Self {
      status: entry.status,
      data: entry.data.clone(),
      error: entry.error.clone(),
      is_stale: entry.stale,
      is_fetching: entry.pending.is_some(),
    }
  }
}

/// Live subscription to one cache entry.
pub struct QueryHandle {
  coordinator: FetchCoordinator,
  fingerprint: Fingerprint,
  subscription: SubscriptionId,
  rx: watch::Receiver<CacheEntry>,
}

impl QueryHandle {
  pub(crate) fn attach(coordinator: FetchCoordinator, fingerprint: Fingerprint) -> Self {
    let (tx, rx) = watch::channel(CacheEntry::new(fingerprint.clone(), chrono::Utc::now()));
    let tx = Arc::new(tx);

    let callback_tx = Arc::clone(&tx);
    let (subscription, current) = coordinator.store().subscribe(
      &fingerprint,
      Arc::new(move |entry: &CacheEntry| {
        // Callbacks from different threads can race; keep the newest revision.
        callback_tx.send_if_modified(|seen| {
          if entry.revision > seen.revision {
            *seen = entry.clone();
            true
          } else {
            false
          }
        });
      }),
    );
    tx.send_if_modified(|seen| {
      if current.revision >= seen.revision {
        *seen = current;
        true
      } else {
        false
      }
    });

    Self {
      coordinator,
      fingerprint,
      subscription,
      rx,
    }
  }

  pub fn fingerprint(&self) -> &Fingerprint {
    &self.fingerprint
  }

  /// Latest snapshot of the underlying entry.
  pub fn entry(&self) -> CacheEntry {
    self.rx.borrow().clone()
  }

  pub fn state(&self) -> QueryState {
    QueryState::from(&*self.rx.borrow())
  }

  /// Force a new request. Retrying after an error is always the caller's call.
  pub fn refetch(&self) {
    self.coordinator.refetch(&self.fingerprint);
  }

  /// Wait for the next change. Returns `None` if the entry can no longer change.
  pub async fn changed(&mut self) -> Option<QueryState> {
    self.rx.changed().await.ok()?;
    Some(QueryState::from(&*self.rx.borrow_and_update()))
  }

  /// Wait until no request is outstanding and return the resulting state.
  pub async fn settled(&mut self) -> QueryState {
    loop {
      let settled = {
        let entry = self.rx.borrow_and_update();
        entry.is_settled().then(|| QueryState::from(&*entry))
      };
      if let Some(state) = settled {
        return state;
      }
      if self.rx.changed().await.is_err() {
        return self.state();
      }
    }
  }
}

impl Drop for QueryHandle {
  fn drop(&mut self) {
    self
      .coordinator
      .store()
      .unsubscribe(&self.fingerprint, self.subscription);
  }
}

impl std::fmt::Debug for QueryHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryHandle")
      .field("fingerprint", &self.fingerprint)
      .field("state", &self.state())
      .finish_non_exhaustive()
  }
}
