//! Durable client state.
//!
//! Keeps user preferences across restarts. The remote-data cache is never
//! persisted.

mod persistor;
mod slice;
mod storage;

pub use persistor::Persistor;
pub use slice::{restore, restore_or_default, snapshot, Preferences, ROOT_KEY};
pub use storage::{KeyValueStorage, NoopStorage, SqliteStorage};
