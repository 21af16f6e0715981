use std::sync::Arc;

use super::Store;
use crate::Result;
use crate::error::Error;

pub const URL_HISTORY_KEY: &str = "urlHistory";
pub const MAX_URLS: usize = 10;

/// Recently connected URLs, most recent first.
#[derive(Debug)]
pub struct UrlHistory {
    store: Arc<dyn Store>,
    urls: Vec<String>,
}

impl UrlHistory {
    /// Read the history from `store`. A missing or unreadable value starts an empty history.
    pub async fn load(store: Arc<dyn Store>) -> Self {
        let urls = match store.get(URL_HISTORY_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                #[cfg(feature = "tracing")]
                tracing::warn!("Ignoring malformed URL history: {e}");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Unable to read URL history: {e}");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
                Vec::new()
            }
        };

        Self { store, urls }
    }

    #[must_use]
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Put `url` at the front, dropping an older copy and anything past [`MAX_URLS`].
    pub async fn record(&mut self, url: &str) -> Result<()> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::validation("URL is empty"));
        }

        self.urls.retain(|existing| existing != url);
        self.urls.insert(0, url.to_owned());
        self.urls.truncate(MAX_URLS);
        self.persist().await
    }

    /// Returns whether `url` was present.
    pub async fn remove(&mut self, url: &str) -> Result<bool> {
        let before = self.urls.len();
        self.urls.retain(|existing| existing != url);
        if self.urls.len() == before {
            return Ok(false);
        }

        self.persist().await?;
        Ok(true)
    }

    async fn persist(&self) -> Result<()> {
        let value = serde_json::to_value(&self.urls)?;
        self.store.set(URL_HISTORY_KEY, value).await
    }
}
