//! JSON-file backend
//!
//! The whole store is a single flat JSON object. Writes go to a sibling
//! temporary file which is then renamed over the original, so a crash never
//! leaves a half-written file behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fms_domain::{FmsError, Result};
use parking_lot::Mutex;
use tracing::debug;

use super::CredentialStore;
use crate::errors::InfraError;

type Entries = BTreeMap<String, String>;

/// Credential store persisted to a JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// The parent directory is created if needed; the file itself is only
    /// written on the first `save`.
    ///
    /// # Errors
    ///
    /// Returns `FmsError::Storage` if the parent directory cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FmsError::from(InfraError::from(e)))?;
        }
        Ok(Self { path, write_lock: Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Entries::new()),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| InfraError::from(e).into())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<()> {
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| FmsError::Internal(format!("failed to encode credentials: {e}")))?;

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, contents).map_err(|e| FmsError::from(InfraError::from(e)))?;
        restrict_permissions(&tmp_path)?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| FmsError::from(InfraError::from(e)))?;

        debug!(path = %self.path.display(), entries = entries.len(), "credential file written");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Entries) -> bool) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut entries = self.read_entries()?;
        if apply(&mut entries) {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| InfraError::from(e).into())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

impl CredentialStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| entries.remove(key).is_some())
    }
}
