//! Message parser - Splits raw lines into command name and free text

/// How a line should be dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode<'a> {
    /// Addressed to the bot: a command name and the text after it
    Command { name: &'a str, text: &'a str },
    /// Plain chatter, only pattern handlers apply
    Passive,
}

/// Detects commands by prefix (`!weather`) or by address (`carik weather`)
#[derive(Debug, Clone)]
pub struct MessageParser {
    command_prefix: String,
    nick: String,
}

impl MessageParser {
    pub fn new(prefix: impl Into<String>, nick: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
            nick: nick.into(),
        }
    }

    pub fn parse<'a>(&self, line: &'a str) -> Mode<'a> {
        let (name, text) = if !self.command_prefix.is_empty() && line.starts_with(&self.command_prefix) {
            split_token(&line[self.command_prefix.len()..])
        } else if !self.nick.is_empty() && line.starts_with(&self.nick) {
            // first token is the address itself
            let (_, rest) = split_token(line);
            split_token(rest)
        } else {
            return Mode::Passive;
        };

        if name.is_empty() {
            return Mode::Passive;
        }
        Mode::Command { name, text }
    }
}

/// Split off the first whitespace-delimited token.
///
/// The token is empty when `s` starts with whitespace; the remainder has its
/// leading whitespace removed.
fn split_token(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(end) => (&s[..end], s[end..].trim_start()),
        None => (s, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> MessageParser {
        MessageParser::new("!", "carik")
    }

    #[test]
    fn test_prefix_command() {
        assert_eq!(
            parser().parse("!weather Warsaw tomorrow"),
            Mode::Command { name: "weather", text: "Warsaw tomorrow" }
        );
        assert_eq!(parser().parse("!ping"), Mode::Command { name: "ping", text: "" });
    }

    #[test]
    fn test_nick_command() {
        assert_eq!(
            parser().parse("carik: weather  Warsaw"),
            Mode::Command { name: "weather", text: "Warsaw" }
        );
    }

    #[test]
    fn test_passive_lines() {
        assert_eq!(parser().parse("hello there"), Mode::Passive);
        assert_eq!(parser().parse("! spaced"), Mode::Passive);
        assert_eq!(parser().parse("carik"), Mode::Passive);
    }

    #[test]
    fn test_multichar_prefix() {
        let parser = MessageParser::new("::", "carik");
        assert_eq!(parser.parse("::seen bob"), Mode::Command { name: "seen", text: "bob" });
    }
}
