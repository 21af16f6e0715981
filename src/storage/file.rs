use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;

use super::Store;
use crate::Result;
use crate::error::{Error, Kind};

/// Store backed by a single JSON object file.
///
/// A missing file reads as empty. Writes go to a sibling temporary file that is then renamed over
/// the original, so a crash never leaves a half-written document behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Map<String, Value>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }

        match serde_json::from_slice(&bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(Error::with_source(
                Kind::Storage,
                std::io::Error::new(
                    ErrorKind::InvalidData,
                    format!("{} does not hold a JSON object", self.path.display()),
                ),
            )),
            Err(e) => Err(Error::with_source(Kind::Storage, e)),
        }
    }

    async fn write(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let staging = self.path.with_extension("tmp");
        let bytes = serde_json::to_vec_pretty(map)?;
        fs::write(&staging, bytes).await?;
        fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        let mut map = self.read().await?;
        Ok(map.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read().await?;
        map.insert(key.to_owned(), value);

        #[cfg(feature = "tracing")]
        tracing::debug!(path = %self.path.display(), %key, "Persisting value");

        self.write(&map).await
    }
}
