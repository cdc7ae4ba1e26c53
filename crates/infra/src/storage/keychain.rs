//! Platform keychain backend
//!
//! Each key becomes its own keychain entry under a shared service name, the
//! way desktop clients keep OAuth tokens out of plain files.

use fms_domain::{FmsError, Result};
use keyring::Entry;
use tracing::debug;

use super::CredentialStore;
use crate::errors::InfraError;

/// Credential store backed by the OS keychain.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).map_err(|e| FmsError::from(InfraError::from(e)))
    }
}

impl CredentialStore for KeyringStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        debug!(service = %self.service, key, "writing keychain entry");
        self.entry(key)?.set_password(value).map_err(|e| InfraError::from(e).into())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }
}
