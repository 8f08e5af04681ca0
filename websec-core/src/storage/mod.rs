//! Session-scoped key/value stores.
//!
//! The host environment owns the session; the toolkit only reads and writes
//! the keys it is given through [`SessionStore`].

pub mod kv;
pub mod memory;

pub use kv::FileSessionStore;
pub use memory::MemorySessionStore;

use serde_json::Value;

use crate::error::Result;

/// Contract a host session must satisfy.
///
/// Each key maps to one value that is read and written as a whole, so a
/// record stored under a single key is never observed half-updated. Both
/// methods fail with `SessionUnavailable` when no session is active.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> Result<()>;
}
