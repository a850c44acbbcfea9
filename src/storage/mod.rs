use crate::domain::session::{AccessToken, RefreshToken, Session, SessionKey};
use async_trait::async_trait;
use thiserror::Error;

pub mod file;
pub mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt session data: {0}")]
    Corrupt(String),
}

/// Durable key-value storage for the two session tokens.
///
/// Implementations must be safe to share between tasks; the gateway holds one
/// behind an `Arc` and reads it before every dispatch.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: SessionKey) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: SessionKey, value: &str) -> Result<(), StoreError>;

    async fn remove(&self, key: SessionKey) -> Result<(), StoreError>;

    /// Removes both tokens.
    async fn clear(&self) -> Result<(), StoreError> {
        for key in SessionKey::ALL {
            self.remove(key).await?;
        }
        Ok(())
    }

    async fn access_token(&self) -> Result<Option<AccessToken>, StoreError> {
        Ok(self.get(SessionKey::AccessToken).await?.map(AccessToken::from))
    }

    async fn refresh_token(&self) -> Result<Option<RefreshToken>, StoreError> {
        Ok(self.get(SessionKey::RefreshToken).await?.map(RefreshToken::from))
    }

    async fn session(&self) -> Result<Session, StoreError> {
        Ok(Session { access_token: self.access_token().await?, refresh_token: self.refresh_token().await? })
    }

    /// Stores a freshly issued token pair (login/registration).
    async fn save(&self, access_token: &AccessToken, refresh_token: &RefreshToken) -> Result<(), StoreError> {
        self.set(SessionKey::AccessToken, access_token.as_str()).await?;
        self.set(SessionKey::RefreshToken, refresh_token.as_str()).await
    }
}
