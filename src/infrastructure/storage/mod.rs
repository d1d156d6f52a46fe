//! In-memory message store with optional JSON file seeding

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::traits::MessageStore;

/// One stored message as it appears in the seed file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoredMessage {
    pub key: String,
    pub channel: String,
    pub message: String,
}

/// Messages keyed by (key, channel); a lookup picks one at random
#[derive(Debug, Default)]
pub struct MemoryStore {
    messages: RwLock<HashMap<(String, String), Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON array of [`StoredMessage`]
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let content = tokio::fs::read_to_string(path).await?;
        let rows: Vec<StoredMessage> = serde_json::from_str(&content)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let store = Self::new();
        for row in rows {
            store.add(row.key, row.channel, row.message).await;
        }
        Ok(store)
    }

    pub async fn add(&self, key: impl Into<String>, channel: impl Into<String>, message: impl Into<String>) {
        let mut messages = self.messages.write().await;
        messages
            .entry((key.into(), channel.into()))
            .or_insert_with(Vec::new)
            .push(message.into());
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait(?Send)]
impl MessageStore for MemoryStore {
    async fn find_fallback_message(&self, key: &str, channel: &str) -> Result<Option<String>, StorageError> {
        let messages = self.messages.read().await;
        let found = messages
            .get(&(key.to_string(), channel.to_string()))
            .and_then(|candidates| candidates.choose(&mut rand::thread_rng()))
            .cloned();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_is_channel_scoped() {
        let store = MemoryStore::new();
        store.add("rules", "#rust", "Be nice").await;

        assert_eq!(
            store.find_fallback_message("rules", "#rust").await.unwrap().as_deref(),
            Some("Be nice")
        );
        assert_eq!(store.find_fallback_message("rules", "#go").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_random_choice_among_candidates() {
        let store = MemoryStore::new();
        store.add("hi", "#a", "hello").await;
        store.add("hi", "#a", "hey").await;

        let found = store.find_fallback_message("hi", "#a").await.unwrap().unwrap();
        assert!(found == "hello" || found == "hey");
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_seed_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.json");
        std::fs::write(
            &path,
            r##"[{"key": "faq", "channel": "#rust", "message": "see the book"}]"##,
        )
        .unwrap();

        let store = MemoryStore::from_json_file(&path).await.unwrap();
        assert!(!store.is_empty().await);
        assert!(matches!(
            MemoryStore::from_json_file(dir.path().join("nope.json")).await,
            Err(StorageError::Io(_))
        ));
    }
}
