use super::Sender;
use chrono::{DateTime, Utc};

/// Whether a message target names a channel rather than a user
pub fn is_channel_name(target: &str) -> bool {
    target.starts_with('#') || target.starts_with('&')
}

/// One incoming chat line
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    /// Channel the line was sent to, or the bot's peer for a private message
    pub target: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(target: impl Into<String>, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            target: target.into(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_private(&self) -> bool {
        !is_channel_name(&self.target)
    }

    /// Channel of the message, `None` for private messages
    pub fn channel(&self) -> Option<&str> {
        if self.is_private() {
            None
        } else {
            Some(&self.target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_detection() {
        let public = Message::new("#rust", Sender::new("bob"), "hi");
        assert!(!public.is_private());
        assert_eq!(public.channel(), Some("#rust"));

        let private = Message::new("bob", Sender::new("bob"), "hi");
        assert!(private.is_private());
        assert_eq!(private.channel(), None);
    }
}
