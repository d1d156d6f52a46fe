use async_trait::async_trait;
use crate::application::errors::BotError;
use crate::domain::entities::Sender;

/// Transport trait - abstraction over the chat network connection.
///
/// Every call is a suspension point for the caller.
#[async_trait(?Send)]
pub trait Transport {
    /// Send `text` addressed to `nick` within `channel`
    async fn reply(&self, nick: &str, text: &str, channel: &str) -> Result<(), BotError>;

    /// Send `text` to a channel or user
    async fn say(&self, text: &str, target: &str) -> Result<(), BotError>;

    /// Ask the network whether `sender` is a bot administrator
    async fn is_admin(&self, sender: &Sender) -> Result<bool, BotError>;
}
