use std::fmt;

/// The user a line came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sender {
    pub nick: String,
    pub user: Option<String>,
    pub host: Option<String>,
}

impl Sender {
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            user: None,
            host: None,
        }
    }

    /// Parse an IRC prefix of the form `nick!user@host`.
    ///
    /// Missing parts are left empty, so `Sender::parse("bob")` is just a nick.
    pub fn parse(prefix: &str) -> Self {
        let (nick, rest) = match prefix.split_once('!') {
            Some((nick, rest)) => (nick, Some(rest)),
            None => (prefix, None),
        };
        let (user, host) = match rest.map(|r| r.split_once('@')) {
            Some(Some((user, host))) => (Some(user.to_string()), Some(host.to_string())),
            Some(None) => (rest.map(str::to_string), None),
            None => (None, None),
        };

        Self {
            nick: nick.to_string(),
            user,
            host,
        }
    }

    /// Full identity, used as the rate limiting key
    pub fn prefix(&self) -> String {
        match (&self.user, &self.host) {
            (Some(user), Some(host)) => format!("{}!{}@{}", self.nick, user, host),
            (Some(user), None) => format!("{}!{}", self.nick, user),
            (None, Some(host)) => format!("{}@{}", self.nick, host),
            (None, None) => self.nick.clone(),
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_prefix() {
        let sender = Sender::parse("bob!~bob@example.org");
        assert_eq!(sender.nick, "bob");
        assert_eq!(sender.user.as_deref(), Some("~bob"));
        assert_eq!(sender.host.as_deref(), Some("example.org"));
        assert_eq!(sender.prefix(), "bob!~bob@example.org");
    }

    #[test]
    fn test_parse_bare_nick() {
        let sender = Sender::parse("alice");
        assert_eq!(sender, Sender::new("alice"));
        assert_eq!(sender.prefix(), "alice");
    }
}
