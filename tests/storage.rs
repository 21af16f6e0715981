#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]

use std::sync::Arc;

use serde_json::{Value, json};
use socket_probe::storage::{
    FileStore, MemoryStore, SavedMessage, SavedMessages, Store, UrlHistory,
};
use socket_probe::types::PayloadKind;

fn file_store(dir: &tempfile::TempDir) -> Arc<dyn Store> {
    Arc::new(FileStore::new(dir.path().join("state.json")))
}

#[tokio::test]
async fn saving_same_message_twice_keeps_one_entry() {
    let mut saved = SavedMessages::load(Arc::new(MemoryStore::new())).await;

    let first = saved
        .save(SavedMessage::new("x", PayloadKind::Text, None))
        .await
        .unwrap();
    let second = saved
        .save(SavedMessage::new("x", PayloadKind::Text, None))
        .await
        .unwrap();

    assert!(first);
    assert!(!second);
    assert_eq!(saved.messages().len(), 1);
}

#[tokio::test]
async fn file_store_survives_new_instances() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = file_store(&dir);
        let mut history = UrlHistory::load(Arc::clone(&store)).await;
        history.record("ws://localhost:8080").await.unwrap();
        history.record("http://localhost:3000/chat").await.unwrap();

        let mut saved = SavedMessages::load(store).await;
        saved
            .save(SavedMessage::new(
                r#"{"a":1}"#,
                PayloadKind::Text,
                Some("ping".to_owned()),
            ))
            .await
            .unwrap();
    }

    let store = file_store(&dir);
    let history = UrlHistory::load(Arc::clone(&store)).await;
    let saved = SavedMessages::load(Arc::clone(&store)).await;

    assert_eq!(
        history.urls(),
        ["http://localhost:3000/chat", "ws://localhost:8080"]
    );
    assert_eq!(saved.messages().len(), 1);
    assert_eq!(saved.messages()[0].event.as_deref(), Some("ping"));

    let raw: Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("state.json")).unwrap()).unwrap();
    assert_eq!(
        raw,
        json!({
            "urlHistory": ["http://localhost:3000/chat", "ws://localhost:8080"],
            "savedMessages": [{"content": "{\"a\":1}", "type": "text", "event": "ping"}]
        })
    );
}

#[tokio::test]
async fn history_written_by_hand_is_read_back() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("state.json"),
        r#"{"urlHistory": ["wss://a", "wss://b"], "other": 1}"#,
    )
    .unwrap();
    let store = file_store(&dir);

    let mut history = UrlHistory::load(Arc::clone(&store)).await;
    assert_eq!(history.urls(), ["wss://a", "wss://b"]);

    history.remove("wss://a").await.unwrap();

    assert_eq!(store.get("urlHistory").await.unwrap(), Some(json!(["wss://b"])));
    assert_eq!(store.get("other").await.unwrap(), Some(json!(1)));
}

#[tokio::test]
async fn unreadable_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("state.json"), "not json").unwrap();
    let store = file_store(&dir);

    let history = UrlHistory::load(Arc::clone(&store)).await;
    let saved = SavedMessages::load(store).await;

    assert!(history.urls().is_empty());
    assert!(saved.messages().is_empty());
}
