//! # Durable Key-Value Storage
//!
//! The cache persists two small pieces of state between runs: the favorites
//! set and the session (last fetch time, selected category). Both go through
//! [`StorageBackend`], a string-keyed store in the spirit of browser local
//! storage.
//!
//! ## Implementations
//!
//! - [`fs::FsStorage`]: one JSON file per key, written atomically.
//! - [`memory::MemStorage`]: in-memory, with write failure injection for tests.
//!
//! Values are opaque strings. Callers own the encoding (always JSON here)
//! and must treat unparseable values as absent rather than failing.

use crate::error::Result;

pub mod fs;
pub mod memory;

/// Storage key for the favorites set (a JSON array of recipe ids).
pub const FAVORITES_KEY: &str = "favoriteRecipes";

/// Storage key for the persisted session state.
pub const SESSION_KEY: &str = "recipe-store";

/// Abstract interface for durable key-value storage.
///
/// All methods take `&self`; implementations use interior mutability where
/// they need it, so one backend can be shared by several owners.
pub trait StorageBackend {
    /// Read the raw value for `key`. `Ok(None)` when nothing is stored.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
