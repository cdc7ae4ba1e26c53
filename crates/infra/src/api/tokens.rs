//! Token store
//!
//! Single source of truth for the access token, the refresh token and the
//! API key. Tokens write through to a [`CredentialStore`]; the API key lives
//! in memory only.

use std::sync::Arc;

use fms_domain::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use fms_domain::Result;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::storage::CredentialStore;

#[derive(Debug, Default)]
struct TokenCache {
    access: Option<String>,
    refresh: Option<String>,
    api_key: Option<String>,
}

/// In-memory token cache over durable storage.
///
/// The durable write happens first and the cache is only updated when it
/// succeeded, both under the cache's write lock, so memory and storage never
/// disagree even with concurrent writers. Getters hydrate lazily
/// from storage when the cached value is unset. Empty strings count as
/// absent.
pub struct TokenStore {
    backend: Arc<dyn CredentialStore>,
    cache: RwLock<TokenCache>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn CredentialStore>) -> Self {
        Self { backend, cache: RwLock::new(TokenCache::default()) }
    }

    /// Set or clear the access token.
    ///
    /// # Errors
    ///
    /// Returns the storage error if persisting fails; the cached value is
    /// left unchanged in that case.
    pub fn set_access_token(&self, token: Option<&str>) -> Result<()> {
        let token = non_empty(token);
        let mut cache = self.cache.write();
        self.persist(ACCESS_TOKEN_KEY, token)?;
        cache.access = token.map(str::to_string);
        Ok(())
    }

    /// Current access token, hydrating from storage on first use.
    pub fn access_token(&self) -> Option<String> {
        if let Some(token) = self.cache.read().access.clone() {
            return Some(token);
        }
        let mut cache = self.cache.write();
        if cache.access.is_none() {
            cache.access = self.hydrate(ACCESS_TOKEN_KEY);
        }
        cache.access.clone()
    }

    /// Set or clear the refresh token.
    ///
    /// # Errors
    ///
    /// Returns the storage error if persisting fails.
    pub fn set_refresh_token(&self, token: Option<&str>) -> Result<()> {
        let token = non_empty(token);
        let mut cache = self.cache.write();
        self.persist(REFRESH_TOKEN_KEY, token)?;
        cache.refresh = token.map(str::to_string);
        Ok(())
    }

    /// Current refresh token. `None` is normal when the backend keeps it in
    /// an HTTP-only cookie.
    pub fn refresh_token(&self) -> Option<String> {
        if let Some(token) = self.cache.read().refresh.clone() {
            return Some(token);
        }
        let mut cache = self.cache.write();
        if cache.refresh.is_none() {
            cache.refresh = self.hydrate(REFRESH_TOKEN_KEY);
        }
        cache.refresh.clone()
    }

    /// Store both tokens after login or registration.
    ///
    /// # Errors
    ///
    /// Returns the first storage error.
    pub fn set_tokens(&self, access: &str, refresh: &str) -> Result<()> {
        let (access, refresh) = (non_empty(Some(access)), non_empty(Some(refresh)));
        let mut cache = self.cache.write();
        self.persist(ACCESS_TOKEN_KEY, access)?;
        cache.access = access.map(str::to_string);
        self.persist(REFRESH_TOKEN_KEY, refresh)?;
        cache.refresh = refresh.map(str::to_string);
        Ok(())
    }

    /// Forget both tokens and the API key, in memory and in storage.
    ///
    /// Memory is cleared unconditionally and both removals are attempted.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub fn clear_tokens(&self) -> Result<()> {
        let mut cache = self.cache.write();
        cache.access = None;
        cache.refresh = None;
        cache.api_key = None;

        let access = self.backend.remove(ACCESS_TOKEN_KEY);
        let refresh = self.backend.remove(REFRESH_TOKEN_KEY);
        debug!("tokens cleared");
        access.and(refresh)
    }

    /// `true` iff an access token is resolvable.
    pub fn has_tokens(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn set_api_key(&self, key: Option<&str>) {
        self.cache.write().api_key = non_empty(key).map(str::to_string);
    }

    pub fn api_key(&self) -> Option<String> {
        self.cache.read().api_key.clone()
    }

    fn persist(&self, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => self.backend.save(key, value),
            None => self.backend.remove(key),
        }
    }

    fn hydrate(&self, key: &str) -> Option<String> {
        match self.backend.load(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                warn!(key, error = %err, "failed to read stored credential");
                None
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use fms_domain::FmsError;

    use super::*;
    use crate::storage::MemoryStore;

    struct BrokenStore;

    impl CredentialStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<String>> {
            Err(FmsError::Storage("unreadable".into()))
        }

        fn save(&self, _key: &str, _value: &str) -> Result<()> {
            Err(FmsError::Storage("read-only".into()))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Err(FmsError::Storage("read-only".into()))
        }
    }

    #[test]
    fn tokens_hydrate_from_storage_after_reload() {
        let backend = Arc::new(MemoryStore::new());
        TokenStore::new(backend.clone()).set_tokens("a", "b").unwrap();

        let reloaded = TokenStore::new(backend);
        assert_eq!(reloaded.access_token().as_deref(), Some("a"));
        assert_eq!(reloaded.refresh_token().as_deref(), Some("b"));
    }

    #[test]
    fn clearing_removes_durable_keys_and_api_key() {
        let backend = Arc::new(MemoryStore::new());
        let store = TokenStore::new(backend.clone());
        store.set_tokens("a", "b").unwrap();
        store.set_api_key(Some("key-1"));

        store.clear_tokens().unwrap();
        store.clear_tokens().unwrap();

        assert!(!store.has_tokens());
        assert_eq!(store.api_key(), None);
        assert!(!backend.contains(ACCESS_TOKEN_KEY));
        assert!(!backend.contains(REFRESH_TOKEN_KEY));
    }

    #[test]
    fn concurrent_writers_leave_cache_and_storage_in_agreement() {
        let backend = Arc::new(MemoryStore::new());
        let store = TokenStore::new(backend.clone());

        std::thread::scope(|scope| {
            for writer in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for round in 0..200 {
                        store.set_access_token(Some(&format!("t{writer}-{round}"))).unwrap();
                    }
                });
            }
        });

        let stored = backend.load(ACCESS_TOKEN_KEY).unwrap();
        assert_eq!(store.access_token(), stored);
    }

    #[test]
    fn setting_none_removes_the_durable_key() {
        let backend = Arc::new(MemoryStore::new());
        let store = TokenStore::new(backend.clone());
        store.set_access_token(Some("a")).unwrap();

        store.set_access_token(None).unwrap();

        assert_eq!(store.access_token(), None);
        assert!(!backend.contains(ACCESS_TOKEN_KEY));
    }

    #[test]
    fn empty_token_is_treated_as_absent() {
        let backend = Arc::new(MemoryStore::new());
        let store = TokenStore::new(backend.clone());

        store.set_access_token(Some("")).unwrap();

        assert!(!store.has_tokens());
        assert!(backend.is_empty());
    }

    #[test]
    fn failed_write_leaves_cache_untouched() {
        let store = TokenStore::new(Arc::new(BrokenStore));

        assert!(store.set_access_token(Some("a")).is_err());
        assert_eq!(store.access_token(), None);
    }

    #[test]
    fn clear_reports_storage_errors_but_still_clears_memory() {
        let store = TokenStore::new(Arc::new(BrokenStore));
        store.set_api_key(Some("key-1"));

        assert!(store.clear_tokens().is_err());
        assert_eq!(store.api_key(), None);
    }
}
