//! Data synchronization and cache layer of the inventory dashboard.
//!
//! - [`cache`]: fingerprinted entries, request coalescing and tag-based
//!   invalidation
//! - [`query`]: the handles the rendering layer subscribes through
//! - [`inventory`]: the REST service's resources, mutations and transport
//! - [`persist`]: preferences that survive a restart
//! - [`aggregate`]: chart series derived from cached collections

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod persist;
pub mod query;
