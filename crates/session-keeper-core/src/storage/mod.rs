//! Durable key-value storage for the persisted session.
//!
//! This module provides:
//! - `KeyValueStorage`: the string key/value seam backends implement
//! - `MemoryStorage`, `FileStorage`, `KeyringStorage`: the backends
//! - `SessionPersistence`: reads and writes the session record under a fixed key

pub mod error;
pub mod file;
pub mod keychain;
pub mod memory;
pub mod persistence;

pub use error::StorageError;
pub use file::FileStorage;
pub use keychain::KeyringStorage;
pub use memory::MemoryStorage;
pub use persistence::{SessionPersistence, SESSION_KEY};

use std::sync::Arc;

use tracing::debug;

use crate::config::{Config, StorageBackend};

/// String key/value store. `remove` of an absent key succeeds.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Open the backend selected in `config`.
pub fn open(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStorage>> {
    debug!(backend = ?config.storage, "Opening session storage");
    let storage: Arc<dyn KeyValueStorage> = match config.storage {
        StorageBackend::File => Arc::new(FileStorage::new(config.cache_dir()?)),
        StorageBackend::Keyring => Arc::new(KeyringStorage::default()),
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
    };
    Ok(storage)
}
