use async_trait::async_trait;
use crate::application::errors::StorageError;

/// Store trait - persisted messages shown for unknown commands
#[async_trait(?Send)]
pub trait MessageStore {
    /// Look up a message stored under `key` for `channel`
    async fn find_fallback_message(&self, key: &str, channel: &str) -> Result<Option<String>, StorageError>;
}
