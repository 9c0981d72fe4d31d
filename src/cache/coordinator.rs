//! Fetch coordinator: the only component that talks to the network.
//!
//! Reads go through [`FetchCoordinator::query`], which serves cached entries
//! and sends at most one live request per fingerprint. Writes go through
//! [`FetchCoordinator::mutate`], which invalidates dependent tags once the
//! server has accepted the change.

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::entry::EntryPatch;
use super::invalidation::InvalidationGraph;
use super::registry::{ResourceDescriptor, ResourceRegistry};
use super::store::CacheStore;
use super::traits::{Fingerprint, Params, ResourceTag, Transport};
use crate::error::{Error, ErrorInfo};
use crate::query::QueryHandle;

/// Behaviour switches for the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorOptions {
  /// Refetch subscribed entries when the client regains focus.
  pub refetch_on_focus: bool,
  /// Refetch subscribed entries when connectivity comes back.
  pub refetch_on_reconnect: bool,
}

impl Default for CoordinatorOptions {
  fn default() -> Self {
    Self {
      refetch_on_focus: true,
      refetch_on_reconnect: true,
    }
  }
}

/// Environment changes that can make cached data suspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
  Focused,
  Reconnected,
}

/// A write against the remote service.
#[derive(Debug, Clone)]
pub struct MutationRequest {
  pub kind: String,
  pub params: Params,
  pub body: Option<Value>,
  /// Tags to invalidate on success, on top of those the graph declares.
  pub invalidates: BTreeSet<ResourceTag>,
}

impl MutationRequest {
  pub fn new(kind: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      params: Params::new(),
      body: None,
      invalidates: BTreeSet::new(),
    }
  }

  pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
    self.params.insert(key.to_string(), value.into());
    self
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  pub fn invalidating(mut self, tags: impl IntoIterator<Item = ResourceTag>) -> Self {
    self.invalidates.extend(tags);
    self
  }
}

struct Inner {
  registry: ResourceRegistry,
  graph: InvalidationGraph,
  store: Arc<CacheStore>,
  transport: Arc<dyn Transport>,
  options: CoordinatorOptions,
}

/// Issues network requests on behalf of the cache and writes results back.
///
/// Cheap to clone; clones share the same store and transport. Methods that
/// start requests spawn onto the current Tokio runtime.
#[derive(Clone)]
pub struct FetchCoordinator {
  inner: Arc<Inner>,
}

impl FetchCoordinator {
  pub fn new(
    registry: ResourceRegistry,
    graph: InvalidationGraph,
    store: Arc<CacheStore>,
    transport: Arc<dyn Transport>,
    options: CoordinatorOptions,
  ) -> Self {
    Self {
      inner: Arc::new(Inner {
        registry,
        graph,
        store,
        transport,
        options,
      }),
    }
  }

  pub fn store(&self) -> &Arc<CacheStore> {
    &self.inner.store
  }

  pub fn registry(&self) -> &ResourceRegistry {
    &self.inner.registry
  }

  /// Subscribe to `resource` with `params`.
  ///
  /// The handle reflects the cached state right away. If the entry is missing
  /// or stale a request is started, unless one for the same fingerprint is
  /// already in flight, in which case this caller simply shares its result.
  ///
  /// Entries idle past the store's grace period are evicted first, so the
  /// store stays bounded without [`spawn_sweeper`](Self::spawn_sweeper).
  pub fn query(&self, resource: &str, params: Params) -> Result<QueryHandle, Error> {
    let descriptor = self.inner.registry.query(resource)?;
    self.inner.store.evict_idle(Utc::now());
    let fingerprint = descriptor.fingerprint(params);
    let handle = QueryHandle::attach(self.clone(), fingerprint.clone());

    if handle.entry().needs_fetch() {
      self.fetch(&descriptor, &fingerprint, false);
    } else {
      debug!(fingerprint = %fingerprint, "cache hit");
    }
    Ok(handle)
  }

  /// Send a fresh request for `fingerprint`, superseding any in flight.
  pub fn refetch(&self, fingerprint: &Fingerprint) {
    match self.inner.registry.query(fingerprint.resource()) {
      Ok(descriptor) => self.fetch(&descriptor, fingerprint, true),
      Err(err) => warn!(fingerprint = %fingerprint, error = %err, "cannot refetch"),
    }
  }

  fn fetch(&self, descriptor: &Arc<ResourceDescriptor>, fingerprint: &Fingerprint, force: bool) {
    let Some(seq) = self.inner.store.begin_request(fingerprint, force) else {
      debug!(fingerprint = %fingerprint, "joined in-flight request");
      return;
    };
    debug!(fingerprint = %fingerprint, seq, force, "sending request");

    let request = descriptor.build_request(fingerprint.params());
    let descriptor = Arc::clone(descriptor);
    let fingerprint = fingerprint.clone();
    let inner = Arc::clone(&self.inner);

    tokio::spawn(async move {
      let result = inner
        .transport
        .send(&request)
        .await
        .and_then(|raw| descriptor.parse_response(raw));

      let patch = match result {
        Ok(data) => EntryPatch::success(data),
        Err(err) => {
          warn!(fingerprint = %fingerprint, error = %err, "query failed");
          EntryPatch::failure(ErrorInfo::from(&err))
        }
      };

      if !inner.store.settle_request(&fingerprint, seq, patch) {
        debug!(fingerprint = %fingerprint, seq, "discarded superseded response");
      }
    });
  }

  /// Run a mutation and invalidate what it affects.
  ///
  /// Invalidation happens only after the service has answered successfully.
  /// On failure nothing in the cache changes and the error is returned for
  /// the caller to display; it is never retried here.
  pub async fn mutate(&self, request: MutationRequest) -> Result<Value, Error> {
    let descriptor = self.inner.registry.mutation(&request.kind)?;
    let spec = descriptor.build_request(&request.params, request.body);

    let raw = self.inner.transport.send(&spec).await.map_err(|err| {
      warn!(kind = %request.kind, error = %err, "mutation failed");
      err
    })?;

    // The server has committed at this point, even if the body turns out to
    // be malformed, so dependents are invalidated before parsing.
    let mut tags = self.inner.graph.tags_for(&request.kind);
    tags.extend(request.invalidates);
    for tag in tags {
      self.invalidate(tag);
    }

    Ok(descriptor.parse_response(raw)?)
  }

  /// Mark every entry carrying `tag` stale and refetch the observed ones.
  ///
  /// Every call forces a new request for each observed entry, even one that
  /// is already stale with a request in flight: that request may have been
  /// sent before the change being signalled. Back-to-back calls therefore
  /// cost one request per call; only the last response is kept.
  pub fn invalidate(&self, tag: ResourceTag) {
    for fingerprint in self.inner.store.invalidate(tag) {
      self.refetch(&fingerprint);
    }
  }

  /// React to focus/reconnect by refreshing everything on screen.
  pub fn handle_event(&self, event: LifecycleEvent) {
    let enabled = match event {
      LifecycleEvent::Focused => self.inner.options.refetch_on_focus,
      LifecycleEvent::Reconnected => self.inner.options.refetch_on_reconnect,
    };
    if !enabled {
      return;
    }
    let refetch = self.inner.store.invalidate_subscribed();
    debug!(?event, entries = refetch.len(), "refetching subscribed entries");
    for fingerprint in refetch {
      self.refetch(&fingerprint);
    }
  }

  /// Periodically evict idle entries. Stops once the store is dropped.
  pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
    let store = Arc::downgrade(&self.inner.store);
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      loop {
        ticker.tick().await;
        let Some(store) = store.upgrade() else {
          break;
        };
        store.evict_idle(Utc::now());
      }
    })
  }
}
