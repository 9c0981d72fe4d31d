//! Client-side cache for remote resources.
//!
//! This module is domain-agnostic. It provides:
//! - A keyed in-memory store of entries with status, data, error and staleness
//! - Reference-counted subscriptions with change callbacks
//! - A fetch coordinator that coalesces concurrent requests per fingerprint
//!   and drops responses that were superseded by a newer request
//! - Tag-based invalidation driven by a declarative mutation graph

mod coordinator;
mod entry;
mod invalidation;
mod registry;
mod store;
#[cfg(test)]
pub(crate) mod testing;
mod traits;

pub use coordinator::{CoordinatorOptions, FetchCoordinator, LifecycleEvent, MutationRequest};
pub use entry::{CacheEntry, EntryPatch, Status};
pub use invalidation::InvalidationGraph;
pub use registry::{
  reserialize, validate, MutationDescriptor, ParseFn, ResourceDescriptor, ResourceRegistry,
};
pub use store::{CacheStore, Callback, SubscriptionId};
pub use traits::{params, Fingerprint, Method, Params, RequestSpec, ResourceTag, Transport};
