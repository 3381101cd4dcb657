//! Key-value storage for the Jualuma mobile core.
//!
//! Mirrors the synchronous `getItem`/`setItem` contract of the platform's
//! local storage so state can be read back the moment a component starts.
//!
//! - [`MemoryStore`]: in-process map, optional byte quota
//! - [`FileStore`]: single JSON file, written through on every mutation

mod error;
mod file_store;
mod memory_store;

pub use error::{StorageError, StorageResult};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;

/// Synchronous string key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key was never written.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }
}
