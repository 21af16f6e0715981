//! Best-effort persistence for the URL history and saved messages.
//!
//! Values are JSON documents under string keys, the same shape a browser extension keeps in its
//! local storage. [`MemoryStore`] keeps them for the life of the process; [`FileStore`] keeps all
//! keys in one JSON object file.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

pub mod file;
pub mod history;
pub mod memory;
pub mod saved;

pub use file::FileStore;
pub use history::UrlHistory;
pub use memory::MemoryStore;
pub use saved::{SavedMessage, SavedMessages};

use crate::Result;

/// Key-value contract for persisted state.
#[async_trait]
pub trait Store: fmt::Debug + Send + Sync {
    /// Value stored under `key`, or `None` when nothing was stored yet.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}
