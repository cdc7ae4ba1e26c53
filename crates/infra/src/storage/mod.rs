//! Durable credential storage
//!
//! A string key-value store that survives process restarts. The token store
//! writes through to one of these backends.

pub mod file;
pub mod keychain;
pub mod memory;

use std::sync::Arc;

use fms_domain::{Result, StorageBackend, StorageConfig};

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

/// Persistent string store keyed by name.
pub trait CredentialStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent.
    fn load(&self, key: &str) -> Result<Option<String>>;

    fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Open the backend selected by configuration.
///
/// # Errors
///
/// Returns `FmsError::Storage` if the backend cannot be initialised (for
/// example, the file backend's directory cannot be created).
pub fn open(config: &StorageConfig) -> Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(FileStore::open(&config.path)?),
        StorageBackend::Keyring => Arc::new(KeyringStore::new(&config.service_name)),
    };
    tracing::debug!(backend = ?config.backend, "credential store opened");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_memory_backend_round_trips() {
        let config = StorageConfig { backend: StorageBackend::Memory, ..Default::default() };
        let store = open(&config).unwrap();

        store.save("k", "v").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn open_file_backend_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("creds.json");
        let config = StorageConfig {
            backend: StorageBackend::File,
            path: path.to_string_lossy().into_owned(),
            ..Default::default()
        };

        let store = open(&config).unwrap();
        store.save("k", "v").unwrap();

        assert!(path.exists());
    }
}
