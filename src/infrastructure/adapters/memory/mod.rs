//! Memory adapter - records outgoing messages instead of sending them

use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::HashSet;

use crate::application::errors::BotError;
use crate::domain::entities::Sender;
use crate::domain::traits::Transport;

/// A message the bot tried to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Reply { nick: String, text: String, channel: String },
    Say { text: String, target: String },
}

impl Outgoing {
    pub fn text(&self) -> &str {
        match self {
            Outgoing::Reply { text, .. } | Outgoing::Say { text, .. } => text,
        }
    }
}

/// Transport that keeps everything in memory, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: RefCell<Vec<Outgoing>>,
    admins: RefCell<HashSet<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admin(self, nick: impl Into<String>) -> Self {
        self.admins.borrow_mut().insert(nick.into());
        self
    }

    pub fn sent(&self) -> Vec<Outgoing> {
        self.sent.borrow().clone()
    }

    /// Drain recorded messages
    pub fn take(&self) -> Vec<Outgoing> {
        self.sent.take()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.borrow().is_empty()
    }
}

#[async_trait(?Send)]
impl Transport for MemoryTransport {
    async fn reply(&self, nick: &str, text: &str, channel: &str) -> Result<(), BotError> {
        self.sent.borrow_mut().push(Outgoing::Reply {
            nick: nick.to_string(),
            text: text.to_string(),
            channel: channel.to_string(),
        });
        Ok(())
    }

    async fn say(&self, text: &str, target: &str) -> Result<(), BotError> {
        self.sent.borrow_mut().push(Outgoing::Say {
            text: text.to_string(),
            target: target.to_string(),
        });
        Ok(())
    }

    async fn is_admin(&self, sender: &Sender) -> Result<bool, BotError> {
        Ok(self.admins.borrow().contains(&sender.nick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_drains() {
        let transport = MemoryTransport::new().with_admin("root");
        transport.say("hi", "#a").await.unwrap();
        transport.reply("bob", "done", "#a").await.unwrap();

        assert!(transport.is_admin(&Sender::new("root")).await.unwrap());
        assert!(!transport.is_admin(&Sender::new("bob")).await.unwrap());
        assert_eq!(transport.take().len(), 2);
        assert!(transport.is_empty());
    }
}
