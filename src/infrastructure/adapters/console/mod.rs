//! Console adapter for development/testing

use async_trait::async_trait;
use chrono::Local;
use std::io::Write;

use crate::application::errors::BotError;
use crate::domain::entities::Sender;
use crate::domain::traits::Transport;
use crate::infrastructure::config::{Config, MAIN};
use crate::infrastructure::format;

/// Console transport for local development; prints instead of sending
pub struct ConsoleAdapter {
    nick: String,
    admins: Vec<String>,
}

impl ConsoleAdapter {
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            admins: Vec::new(),
        }
    }

    /// Bot nick and admins (`main.admins`) from the config
    pub fn from_config(config: &Config) -> Self {
        Self {
            nick: config.get(MAIN, "nick").unwrap_or("carik").to_string(),
            admins: config.get_list(MAIN, "admins"),
        }
    }

    pub fn with_admin(mut self, nick: impl Into<String>) -> Self {
        self.admins.push(nick.into());
        self
    }

    fn print(&self, target: &str, text: &str) -> Result<(), BotError> {
        writeln!(
            std::io::stdout().lock(),
            "{} [{}] <{}> {}",
            Local::now().format("%H:%M:%S"),
            target,
            self.nick,
            format::strip(text)
        )
        .map_err(|e| BotError::Transport(format!("Failed to write to console: {}", e)))
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new("carik")
    }
}

#[async_trait(?Send)]
impl Transport for ConsoleAdapter {
    async fn reply(&self, nick: &str, text: &str, channel: &str) -> Result<(), BotError> {
        self.print(channel, &format!("{}: {}", nick, text))
    }

    async fn say(&self, text: &str, target: &str) -> Result<(), BotError> {
        self.print(target, text)
    }

    async fn is_admin(&self, sender: &Sender) -> Result<bool, BotError> {
        Ok(self.admins.iter().any(|admin| admin == &sender.nick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_admins_from_config() {
        let mut config = Config::default();
        config.set(MAIN, "admins", "root, ops");
        let console = ConsoleAdapter::from_config(&config).with_admin("owner");

        for nick in ["root", "ops", "owner"] {
            assert!(console.is_admin(&Sender::new(nick)).await.unwrap());
        }
        assert!(!console.is_admin(&Sender::new("guest")).await.unwrap());
        assert!(console.say("\x02hello\x02", "#rust").await.is_ok());
    }
}
