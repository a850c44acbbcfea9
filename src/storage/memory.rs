use crate::domain::session::SessionKey;
use crate::storage::{SessionStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;

/// Process-lifetime session store. Useful for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: DashMap<SessionKey, String>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tokens(access_token: &str, refresh_token: &str) -> Self {
        let store = Self::new();
        store.entries.insert(SessionKey::AccessToken, access_token.to_string());
        store.entries.insert(SessionKey::RefreshToken, refresh_token.to_string());
        store
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: SessionKey) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(&key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: SessionKey, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key, value.to_string());
        Ok(())
    }

    async fn remove(&self, key: SessionKey) -> Result<(), StoreError> {
        self.entries.remove(&key);
        Ok(())
    }
}
