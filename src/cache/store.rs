//! In-memory keyed store of cache entries.
//!
//! The store is the only shared mutable state in the sync layer. Every write
//! goes through a method here and happens under one lock; readers get cloned
//! snapshots. Subscriber callbacks run after the lock is released, so a
//! callback may safely call back into the store.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::entry::{CacheEntry, EntryPatch, Status};
use super::traits::{Fingerprint, ResourceTag};

/// Observer invoked with the new snapshot after every change to an entry.
pub type Callback = Arc<dyn Fn(&CacheEntry) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Slot {
  entry: CacheEntry,
  subscribers: Vec<(SubscriptionId, Callback)>,
  /// When the last subscriber left. `None` while anyone is subscribed.
  idle_since: Option<DateTime<Utc>>,
}

impl Slot {
  fn new(fingerprint: Fingerprint, now: DateTime<Utc>) -> Self {
    Self {
      entry: CacheEntry::new(fingerprint, now),
      subscribers: Vec::new(),
      idle_since: Some(now),
    }
  }

  fn is_watched(&self) -> bool {
    !self.subscribers.is_empty() || self.entry.pending.is_some()
  }
}

type Notification = (Vec<Callback>, CacheEntry);

#[derive(Default)]
struct Inner {
  slots: HashMap<Fingerprint, Slot>,
  revision: u64,
  next_subscription: u64,
  next_seq: u64,
}

impl Inner {
  fn slot(&mut self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> &mut Slot {
    self
      .slots
      .entry(fingerprint.clone())
      .or_insert_with(|| Slot::new(fingerprint.clone(), now))
  }

  /// Stamp a new revision on an entry that changed and collect its observers.
  fn commit(&mut self, fingerprint: &Fingerprint) -> Option<Notification> {
    self.revision += 1;
    let revision = self.revision;
    self.slots.get_mut(fingerprint).map(|slot| {
      slot.entry.revision = revision;
      let callbacks = slot.subscribers.iter().map(|(_, cb)| cb.clone()).collect();
      (callbacks, slot.entry.clone())
    })
  }
}

/// Keyed store mapping fingerprints to cache entries.
pub struct CacheStore {
  inner: Mutex<Inner>,
  /// How long an unobserved entry is kept before it may be evicted.
  grace: Duration,
}

impl CacheStore {
  pub fn new(grace: Duration) -> Self {
    Self {
      inner: Mutex::new(Inner::default()),
      grace,
    }
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    // No method leaves the map half-written, so a poisoned lock is still usable.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn notify(notifications: Vec<Notification>) {
    for (callbacks, entry) in notifications {
      for callback in callbacks {
        callback(&entry);
      }
    }
  }

  /// Snapshot of the entry for `fingerprint`, if one exists.
  pub fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
    self.lock().slots.get(fingerprint).map(|s| s.entry.clone())
  }

  pub fn len(&self) -> usize {
    self.lock().slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Merge `patch` into the entry, creating it if needed.
  pub fn upsert(&self, fingerprint: &Fingerprint, patch: EntryPatch) -> CacheEntry {
    let now = Utc::now();
    let (entry, notification) = {
      let mut inner = self.lock();
      let slot = inner.slot(fingerprint, now);
      let changed = patch.apply(&mut slot.entry, now);
      let snapshot = slot.entry.clone();
      if changed {
        match inner.commit(fingerprint) {
          Some(n) => (n.1.clone(), Some(n)),
          None => (snapshot, None),
        }
      } else {
        (snapshot, None)
      }
    };
    Self::notify(notification.into_iter().collect());
    entry
  }

  /// Mark every entry derived from `tag` stale, keeping its data.
  ///
  /// Returns the entries that need a background refetch: those somebody is
  /// subscribed to, and those with a request in flight whose response now
  /// predates the invalidation.
  pub fn invalidate(&self, tag: ResourceTag) -> Vec<Fingerprint> {
    let refetch = self.mark_stale(|fp, _| fp.tag() == tag);
    debug!(tag = %tag, refetch = refetch.len(), "invalidated tag");
    refetch
  }

  /// Mark every subscribed entry stale. Used on focus and reconnect.
  pub fn invalidate_subscribed(&self) -> Vec<Fingerprint> {
    self.mark_stale(|_, slot| !slot.subscribers.is_empty())
  }

  fn mark_stale(&self, matches: impl Fn(&Fingerprint, &Slot) -> bool) -> Vec<Fingerprint> {
    let now = Utc::now();
    let mut refetch = Vec::new();
    let notifications = {
      let mut inner = self.lock();
      let mut changed = Vec::new();
      for (fp, slot) in inner.slots.iter_mut() {
        if !matches(fp, slot) {
          continue;
        }
        if EntryPatch::stale().apply(&mut slot.entry, now) {
          changed.push(fp.clone());
        }
        if slot.is_watched() {
          refetch.push(fp.clone());
        }
      }
      changed
        .iter()
        .filter_map(|fp| inner.commit(fp))
        .collect::<Vec<_>>()
    };
    Self::notify(notifications);
    refetch
  }

  /// Register `callback` for changes to `fingerprint`.
  ///
  /// Creates an Uninitialized entry if none exists. Returns the id to pass to
  /// [`unsubscribe`](Self::unsubscribe) and the entry as it is now.
  pub fn subscribe(
    &self,
    fingerprint: &Fingerprint,
    callback: Callback,
  ) -> (SubscriptionId, CacheEntry) {
    let now = Utc::now();
    let mut inner = self.lock();
    inner.next_subscription += 1;
    let id = SubscriptionId(inner.next_subscription);
    let slot = inner.slot(fingerprint, now);
    slot.subscribers.push((id, callback));
    slot.entry.subscriber_count = slot.subscribers.len();
    slot.idle_since = None;
    (id, slot.entry.clone())
  }

  pub fn unsubscribe(&self, fingerprint: &Fingerprint, id: SubscriptionId) {
    let mut inner = self.lock();
    if let Some(slot) = inner.slots.get_mut(fingerprint) {
      slot.subscribers.retain(|(sid, _)| *sid != id);
      slot.entry.subscriber_count = slot.subscribers.len();
      if slot.subscribers.is_empty() {
        slot.idle_since = Some(Utc::now());
      }
    }
  }

  /// Fingerprints that currently have at least one subscriber.
  pub fn subscribed(&self) -> Vec<Fingerprint> {
    self
      .lock()
      .slots
      .iter()
      .filter(|(_, slot)| !slot.subscribers.is_empty())
      .map(|(fp, _)| fp.clone())
      .collect()
  }

  /// Record a new request for `fingerprint` and move it to Loading.
  ///
  /// Returns `None` when a request is already in flight and `force` is false;
  /// the caller should attach to that request instead of sending another.
  /// With `force`, the new request supersedes the old one, whose response
  /// will be rejected by [`settle_request`](Self::settle_request).
  pub fn begin_request(&self, fingerprint: &Fingerprint, force: bool) -> Option<u64> {
    let now = Utc::now();
    let (seq, notification) = {
      let mut inner = self.lock();
      if !force {
        let pending = inner.slots.get(fingerprint).and_then(|s| s.entry.pending);
        if pending.is_some() {
          return None;
        }
      }
      inner.next_seq += 1;
      let seq = inner.next_seq;
      let slot = inner.slot(fingerprint, now);
      slot.entry.pending = Some(seq);
      EntryPatch::loading().apply(&mut slot.entry, now);
      (seq, inner.commit(fingerprint))
    };
    Self::notify(notification.into_iter().collect());
    Some(seq)
  }

  /// Apply the outcome of request `seq`.
  ///
  /// Only the most recently issued request for a fingerprint may settle it;
  /// anything older is discarded and `false` is returned.
  pub fn settle_request(&self, fingerprint: &Fingerprint, seq: u64, patch: EntryPatch) -> bool {
    let now = Utc::now();
    let notification = {
      let mut inner = self.lock();
      let Some(slot) = inner.slots.get_mut(fingerprint) else {
        return false;
      };
      if slot.entry.pending != Some(seq) {
        return false;
      }
      slot.entry.pending = None;
      patch.apply(&mut slot.entry, now);
      if slot.subscribers.is_empty() {
        // Nobody was watching; the idle clock starts once the result lands.
        slot.idle_since = Some(now);
      }
      inner.commit(fingerprint)
    };
    Self::notify(notification.into_iter().collect());
    true
  }

  /// Drop entries nobody has observed for longer than the grace period.
  pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
    let mut inner = self.lock();
    let before = inner.slots.len();
    let grace = self.grace;
    inner.slots.retain(|_, slot| {
      let expired = slot
        .idle_since
        .map(|since| now - since >= grace)
        .unwrap_or(false);
      slot.is_watched() || !expired
    });
    let evicted = before - inner.slots.len();
    if evicted > 0 {
      debug!(evicted, remaining = inner.slots.len(), "evicted idle cache entries");
    }
    evicted
  }

  /// Forget all cached data.
  ///
  /// Entries with live subscribers are reset to Uninitialized so their
  /// observers stay attached; everything else is removed. In-flight
  /// responses are discarded when they arrive.
  pub fn clear(&self) {
    let now = Utc::now();
    let notifications = {
      let mut inner = self.lock();
      inner.slots.retain(|_, slot| !slot.subscribers.is_empty());
      let kept: Vec<Fingerprint> = inner.slots.keys().cloned().collect();
      for fp in &kept {
        if let Some(slot) = inner.slots.get_mut(fp) {
          let subscriber_count = slot.entry.subscriber_count;
          slot.entry = CacheEntry::new(fp.clone(), now);
          slot.entry.subscriber_count = subscriber_count;
        }
      }
      kept
        .iter()
        .filter_map(|fp| inner.commit(fp))
        .collect::<Vec<_>>()
    };
    Self::notify(notifications);
  }

  /// Entries currently in the given status. Mostly useful for diagnostics.
  pub fn count_in(&self, status: Status) -> usize {
    self
      .lock()
      .slots
      .values()
      .filter(|s| s.entry.status == status)
      .count()
  }
}

impl Default for CacheStore {
  fn default() -> Self {
    // Matches the usual keep-unused-data window of a minute.
    Self::new(Duration::seconds(60))
  }
}
