use super::Store;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Store backed by one JSON object file in the app data dir.
///
/// The lock only serializes writers inside this process; another process
/// pointed at the same file can still interleave with us.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Create the parent directory if needed and return a store for `path`.
    pub async fn open(path: PathBuf) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::storage(format!("{}: {}", parent.display(), e)))?;
        }
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole object. A missing or empty file is an empty object.
    async fn load(&self) -> AppResult<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&content)
            .map_err(|e| AppError::storage(format!("{}: {}", self.path.display(), e)))
    }

    /// Write through a temp file so readers never see a half-written object.
    async fn save(&self, data: &Map<String, Value>) -> AppResult<()> {
        let content = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        data.insert(key.to_string(), value);
        self.save(&data).await?;
        debug!(key, path = %self.path.display(), "store written");
        Ok(())
    }
}
