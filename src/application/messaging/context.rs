//! Request context handed to every handler invocation

use std::rc::Rc;

use crate::application::errors::BotError;
use crate::domain::entities::Sender;
use crate::domain::traits::Transport;
use crate::plugins::plugin::{PluginConfig, Temp};
use crate::plugins::registry::PluginRegistry;

/// Context of one handler invocation
#[derive(Clone)]
pub struct RequestContext {
    sender: Sender,
    channel: Option<String>,
    config: PluginConfig,
    private: bool,
    temp: Temp,
    plugin: String,
    transport: Rc<dyn Transport>,
    registry: Rc<PluginRegistry>,
}

impl RequestContext {
    pub fn new(
        sender: Sender,
        channel: Option<String>,
        config: PluginConfig,
        temp: Temp,
        plugin: impl Into<String>,
        transport: Rc<dyn Transport>,
        registry: Rc<PluginRegistry>,
    ) -> Self {
        Self {
            private: channel.is_none(),
            sender,
            channel,
            config,
            temp,
            plugin: plugin.into(),
            transport,
            registry,
        }
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn nick(&self) -> &str {
        &self.sender.nick
    }

    /// `None` for private messages
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Plugin config merged with `__nick__`
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    pub fn temp(&self) -> &Temp {
        &self.temp
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    pub fn transport(&self) -> &Rc<dyn Transport> {
        &self.transport
    }

    pub fn registry(&self) -> &Rc<PluginRegistry> {
        &self.registry
    }

    /// Where a reply goes: the channel, or the sender in private
    pub fn target(&self) -> &str {
        self.channel.as_deref().unwrap_or(&self.sender.nick)
    }

    /// Answer the sender
    pub async fn reply(&self, text: impl AsRef<str>) -> Result<(), BotError> {
        self.transport
            .reply(&self.sender.nick, text.as_ref(), self.target())
            .await
    }

    /// Say something where the request came from
    pub async fn say(&self, text: impl AsRef<str>) -> Result<(), BotError> {
        self.transport.say(text.as_ref(), self.target()).await
    }

    pub async fn say_to(&self, text: impl AsRef<str>, target: &str) -> Result<(), BotError> {
        self.transport.say(text.as_ref(), target).await
    }

    pub async fn is_admin(&self) -> Result<bool, BotError> {
        self.transport.is_admin(&self.sender).await
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("sender", &self.sender)
            .field("channel", &self.channel)
            .field("plugin", &self.plugin)
            .field("private", &self.private)
            .finish()
    }
}
