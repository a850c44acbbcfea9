use crate::domain::session::SessionKey;
use crate::storage::{SessionStore, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl SessionFile {
    const fn slot(&mut self, key: SessionKey) -> &mut Option<String> {
        match key {
            SessionKey::AccessToken => &mut self.token,
            SessionKey::RefreshToken => &mut self.refresh_token,
        }
    }
}

/// JSON file on disk that survives process restarts.
///
/// Every write replaces the file atomically (write to a sibling, then rename),
/// and writes are serialized within the process.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<SessionFile, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(SessionFile::default()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SessionFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, contents: &SessionFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.temp_path();
        let written = Self::write_then_rename(&tmp, &self.path, &bytes).await;
        if written.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        written
    }

    async fn write_then_rename(tmp: &Path, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        tokio::fs::write(tmp, bytes).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(tmp, target).await?;
        Ok(())
    }

    /// Sibling of the session file, unique per write so that several
    /// processes sharing one session file never write the same temp file.
    fn temp_path(&self) -> PathBuf {
        let name = self.path.file_name().map_or_else(|| "session".into(), |n| n.to_string_lossy());
        self.path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
    }

    async fn update(&self, key: SessionKey, value: Option<&str>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut contents = self.read().await?;
        *contents.slot(key) = value.map(str::to_string);
        self.write(&contents).await?;
        tracing::debug!(key = %key, path = %self.path.display(), present = value.is_some(), "Session file updated");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: SessionKey) -> Result<Option<String>, StoreError> {
        let mut contents = self.read().await?;
        Ok(contents.slot(key).take())
    }

    async fn set(&self, key: SessionKey, value: &str) -> Result<(), StoreError> {
        self.update(key, Some(value)).await
    }

    async fn remove(&self, key: SessionKey) -> Result<(), StoreError> {
        self.update(key, None).await
    }
}
