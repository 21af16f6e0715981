use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Store;
use crate::Result;
use crate::types::PayloadKind;

pub const SAVED_MESSAGES_KEY: &str = "savedMessages";

/// A payload kept for resending.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMessage {
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: PayloadKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl SavedMessage {
    /// A blank event name is stored as no event name.
    pub fn new<S: Into<String>>(content: S, kind: PayloadKind, event: Option<String>) -> Self {
        Self {
            content: content.into(),
            kind,
            event: event
                .map(|event| event.trim().to_owned())
                .filter(|event| !event.is_empty()),
        }
    }
}

/// Saved payloads, newest first.
#[derive(Debug)]
pub struct SavedMessages {
    store: Arc<dyn Store>,
    messages: Vec<SavedMessage>,
}

impl SavedMessages {
    /// Read the saved messages from `store`. A missing or unreadable value starts an empty list.
    pub async fn load(store: Arc<dyn Store>) -> Self {
        let messages = match store.get(SAVED_MESSAGES_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                #[cfg(feature = "tracing")]
                tracing::warn!("Ignoring malformed saved messages: {e}");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Unable to read saved messages: {e}");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
                Vec::new()
            }
        };

        Self { store, messages }
    }

    #[must_use]
    pub fn messages(&self) -> &[SavedMessage] {
        &self.messages
    }

    /// Save `message` unless an entry with the same content, kind and event exists.
    ///
    /// Returns whether it was added.
    pub async fn save(&mut self, message: SavedMessage) -> Result<bool> {
        if self.messages.contains(&message) {
            return Ok(false);
        }

        self.messages.insert(0, message);
        self.persist().await?;
        Ok(true)
    }

    /// Remove the entry at `index`, as listed by [`messages`](Self::messages).
    pub async fn remove(&mut self, index: usize) -> Result<Option<SavedMessage>> {
        if index >= self.messages.len() {
            return Ok(None);
        }

        let removed = self.messages.remove(index);
        self.persist().await?;
        Ok(Some(removed))
    }

    async fn persist(&self) -> Result<()> {
        let value = serde_json::to_value(&self.messages)?;
        self.store.set(SAVED_MESSAGES_KEY, value).await
    }
}
