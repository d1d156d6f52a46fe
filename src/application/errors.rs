//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
}

/// Plugin lifecycle errors, returned to whoever asked for the load
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Failed to load plugin: {0}")]
    Load(String),

    #[error("Invalid pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Setup of plugin '{plugin}' failed: {reason}")]
    Setup { plugin: String, reason: String },

    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Plugin already loaded: {0}")]
    AlreadyLoaded(String),
}

/// Why a handler's arguments could not be bound.
///
/// These are usage errors, never reported back to the chat.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("takes {expected} positional arguments but {got} were given")]
    TooManyPositional { expected: usize, got: usize },

    #[error("got an unexpected keyword argument '{0}'")]
    UnexpectedNamed(String),

    #[error("got multiple values for argument '{0}'")]
    Duplicate(String),

    #[error("missing required argument '{0}'")]
    Missing(String),

    #[error("invalid value {value:?} for '{param}': {reason}")]
    Coercion {
        param: String,
        value: String,
        reason: String,
    },
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// A handler that failed while running: either it returned an error or it
/// panicked. Captured at the dispatcher boundary and reported once.
#[derive(Debug, Clone)]
pub struct HandlerFault {
    pub plugin: String,
    pub handler: String,
    pub message: String,
    /// Causes below `message`, outermost first
    pub causes: Vec<String>,
    pub panicked: bool,
}

impl HandlerFault {
    pub fn from_error(plugin: &str, handler: &str, error: &anyhow::Error) -> Self {
        Self {
            plugin: plugin.to_string(),
            handler: handler.to_string(),
            message: error.to_string(),
            causes: error.chain().skip(1).map(|cause| cause.to_string()).collect(),
            panicked: false,
        }
    }

    pub fn from_panic(plugin: &str, handler: &str, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            msg.to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "handler panicked".to_string()
        };

        Self {
            plugin: plugin.to_string(),
            handler: handler.to_string(),
            message,
            causes: Vec::new(),
            panicked: true,
        }
    }

    /// Where the fault happened, e.g. `weather::weather`
    pub fn location(&self) -> String {
        if self.panicked {
            format!("panicked in {}::{}", self.plugin, self.handler)
        } else {
            format!("in {}::{}", self.plugin, self.handler)
        }
    }

    /// The error line: the message, followed by its root cause when there is one
    pub fn error_line(&self) -> String {
        match self.causes.last() {
            Some(root) => format!("{}: {}", self.message, root),
            None => self.message.clone(),
        }
    }

}

impl std::fmt::Display for HandlerFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.error_line(), self.location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_fault_keeps_root_cause() {
        let err: anyhow::Result<i64> = "abc".parse::<i64>().context("bad temperature");
        let fault = HandlerFault::from_error("weather", "weather", &err.unwrap_err());

        assert_eq!(fault.message, "bad temperature");
        assert_eq!(fault.error_line(), "bad temperature: invalid digit found in string");
        assert_eq!(fault.location(), "in weather::weather");
        assert_eq!(fault.causes.len(), 1);
    }

    #[test]
    fn test_fault_from_panic_payload() {
        let fault = HandlerFault::from_panic("admin", "kick", Box::new("boom"));
        assert!(fault.panicked);
        assert_eq!(fault.error_line(), "boom");
        assert_eq!(fault.location(), "panicked in admin::kick");
    }
}
