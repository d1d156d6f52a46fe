//! Configuration management
//!
//! The configuration is a set of named sections holding flat string
//! key/value pairs, read from YAML:
//!
//! ```yaml
//! main:
//!   command-prefix: "!"
//!   nick: carik
//!   time_to_block: 60
//!   executed_commands_per_time: 5
//! plugins:
//!   admin: builtin.admin
//! plugin:admin:
//!   whitelist: "#ops"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Value;

use crate::application::errors::ConfigError;

/// One config section, in file order
pub type Section = IndexMap<String, String>;

pub const MAIN: &str = "main";
pub const PLUGINS: &str = "plugins";

/// Bot configuration
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Config {
    sections: IndexMap<String, Section>,
}

/// Typed view of the `main` section
#[derive(Debug, Clone)]
pub struct MainSettings {
    pub command_prefix: String,
    pub nick: String,
    pub time_to_block: Duration,
    pub executed_commands_per_time: u32,
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self::empty();
        config.set(MAIN, "command-prefix", "!");
        config.set(MAIN, "nick", "carik");
        config.set(MAIN, "time_to_block", "60");
        config.set(MAIN, "executed_commands_per_time", "5");
        config.set(MAIN, "admins", "");
        config.set(PLUGINS, "admin", crate::plugins::builtin::admin::MODULE_PATH);
        config
    }
}

impl Config {
    /// Config without any section
    pub fn empty() -> Self {
        Self {
            sections: IndexMap::new(),
        }
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: IndexMap<String, Option<IndexMap<String, Value>>> = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;

        let mut sections = IndexMap::with_capacity(raw.len());
        for (name, entries) in raw {
            let mut section = Section::new();
            for (key, value) in entries.unwrap_or_default() {
                let value = scalar_to_string(&value)
                    .ok_or_else(|| ConfigError::InvalidValue(format!("{}.{} is not a scalar", name, key)))?;
                section.insert(key, value);
            }
            sections.insert(name, section);
        }
        Ok(Self { sections })
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    /// Defaults with environment overrides
    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            self.set(MAIN, "command-prefix", prefix);
        }

        if let Ok(nick) = std::env::var("BOT_NICK") {
            self.set(MAIN, "nick", nick);
        }
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Key/value pairs of a section in file order; empty if it is missing
    pub fn items(&self, section: &str) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|s| s.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    pub fn get_int(&self, section: &str, key: &str) -> Result<i64, ConfigError> {
        let raw = self
            .get(section, key)
            .ok_or_else(|| ConfigError::MissingField(format!("{}.{}", section, key)))?;
        raw.trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{}.{} = {:?} is not an integer", section, key, raw)))
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Comma separated list, entries trimmed, empties dropped
    pub fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get(section, key).map(split_list).unwrap_or_default()
    }

    /// Configured `name -> module path` pairs of the `plugins` section
    pub fn plugins(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items(PLUGINS)
    }

    /// Flat config of one plugin
    pub fn plugin_section(&self, name: &str) -> Section {
        self.items(&format!("plugin:{}", name))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn settings(&self) -> Result<MainSettings, ConfigError> {
        let required = |key: &str| {
            self.get(MAIN, key)
                .map(str::to_string)
                .ok_or_else(|| ConfigError::MissingField(format!("{}.{}", MAIN, key)))
        };
        let non_negative = |key: &str| -> Result<u64, ConfigError> {
            let value = self.get_int(MAIN, key)?;
            u64::try_from(value)
                .map_err(|_| ConfigError::InvalidValue(format!("{}.{} must not be negative", MAIN, key)))
        };

        let executed = non_negative("executed_commands_per_time")?;
        Ok(MainSettings {
            command_prefix: required("command-prefix")?,
            nick: required("nick")?,
            time_to_block: Duration::from_secs(non_negative("time_to_block")?),
            executed_commands_per_time: u32::try_from(executed).unwrap_or(u32::MAX),
        })
    }
}

/// Split a comma separated config value
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Sequence(items) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Option<Vec<_>>>()
            .map(|items| items.join(",")),
        Value::Mapping(_) | Value::Tagged(_) => None,
    }
}
