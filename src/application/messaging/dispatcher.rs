//! Message dispatcher - Routes chat lines to plugin handlers
//!
//! For every resolved handler the invocation runs: rate check, context,
//! argument binding, admin check, then the handler itself. Misses, bind
//! failures and permission failures are silent; a failing handler is
//! reported once to the sender.

use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use futures::FutureExt;
use tracing::{debug, error, warn};

use super::args::{bind, tokenize, RawArgs};
use super::context::RequestContext;
use super::parser::Mode;
use super::rate_limit::RateLimiter;
use super::resolver::{Candidate, Resolver};
use crate::application::errors::{BindError, ConfigError, HandlerFault};
use crate::domain::entities::{Message, Sender};
use crate::domain::traits::{MessageStore, Transport};
use crate::infrastructure::config::MainSettings;
use crate::infrastructure::format::{bold, color, Color};
use crate::plugins::registry::PluginRegistry;

/// Outcome of one handler invocation
#[derive(Debug, Clone)]
pub enum Invocation {
    Completed,
    RateLimited,
    BindFailed(BindError),
    NotAdmin,
    Faulted(HandlerFault),
}

impl Invocation {
    pub fn is_completed(&self) -> bool {
        matches!(self, Invocation::Completed)
    }
}

/// What happened to one incoming line
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// A command handler was selected
    Command(Invocation),
    /// No handler matched a channel command; `sent` tells whether the store had a message
    Fallback { sent: bool },
    /// No handler matched a private command
    Unknown,
    /// Plain chatter; one entry per pattern match
    Patterns(Vec<Invocation>),
}

/// Message dispatcher
pub struct Dispatcher {
    settings: MainSettings,
    resolver: Resolver,
    registry: Rc<PluginRegistry>,
    limiter: RefCell<RateLimiter>,
    transport: Rc<dyn Transport>,
    store: Option<Rc<dyn MessageStore>>,
}

impl Dispatcher {
    pub fn new(registry: Rc<PluginRegistry>) -> Result<Self, ConfigError> {
        let settings = registry.config().settings()?;
        let transport = Rc::clone(&registry.host().transport);

        Ok(Self {
            resolver: Resolver::new(&settings),
            limiter: RefCell::new(RateLimiter::from_settings(&settings)),
            settings,
            registry,
            transport,
            store: None,
        })
    }

    /// Store consulted for channel commands no handler knows
    pub fn with_store(mut self, store: Rc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn settings(&self) -> &MainSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Rc<PluginRegistry> {
        &self.registry
    }

    pub async fn dispatch(&self, message: &Message) -> Dispatch {
        self.execute(message.channel(), &message.sender, &message.text).await
    }

    /// Handle one line; `channel` is `None` for private messages
    pub async fn execute(&self, channel: Option<&str>, sender: &Sender, line: &str) -> Dispatch {
        let private = channel.is_none();
        let plugins = self.registry.snapshot();

        match self.resolver.detect(line) {
            Mode::Command { name, text } => {
                match self.resolver.find_command(&plugins, name, private, channel) {
                    Some(candidate) => {
                        let raw = tokenize(text, candidate.handler().max_positional_args());
                        Dispatch::Command(self.invoke(&candidate, raw, channel, sender, true).await)
                    }
                    None => match channel {
                        Some(channel) => Dispatch::Fallback {
                            sent: self.fallback(name, channel).await,
                        },
                        None => Dispatch::Unknown,
                    },
                }
            }
            Mode::Passive => {
                let matches = self.resolver.find_patterns(&plugins, line, private);
                let mut outcomes = Vec::with_capacity(matches.len());
                for found in matches {
                    outcomes.push(self.invoke(&found.candidate, found.args, channel, sender, false).await);
                }
                Dispatch::Patterns(outcomes)
            }
        }
    }

    async fn invoke(
        &self,
        candidate: &Candidate,
        raw: RawArgs,
        channel: Option<&str>,
        sender: &Sender,
        command: bool,
    ) -> Invocation {
        let handler = candidate.handler();
        let plugin = &candidate.plugin;

        if command && handler.rate_limited && self.limiter.borrow_mut().is_blocked(&sender.prefix()) {
            return Invocation::RateLimited;
        }

        let ctx = RequestContext::new(
            sender.clone(),
            channel.map(str::to_string),
            self.resolver.merged_config(plugin),
            plugin.temp().clone(),
            plugin.name(),
            Rc::clone(&self.transport),
            Rc::clone(&self.registry),
        );

        let args = match bind(handler, raw) {
            Ok(args) => args,
            Err(e) => {
                debug!("Arguments for {}::{} rejected: {}", plugin.name(), handler.name, e);
                return Invocation::BindFailed(e);
            }
        };

        if handler.admin_required {
            match ctx.is_admin().await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("{} is not an admin, skipping {}::{}", sender, plugin.name(), handler.name);
                    return Invocation::NotAdmin;
                }
                Err(e) => {
                    warn!("Admin check for {} failed: {}", sender, e);
                    return Invocation::NotAdmin;
                }
            }
        }

        let target = ctx.target().to_string();
        let owner = Rc::clone(plugin);
        let index = candidate.index;
        let outcome = AssertUnwindSafe(async move { owner.handlers()[index].call(ctx, args).await })
            .catch_unwind()
            .await;

        let fault = match outcome {
            Ok(Ok(())) => return Invocation::Completed,
            Ok(Err(e)) => {
                error!("Handler {}::{} failed: {:?}", plugin.name(), handler.name, e);
                HandlerFault::from_error(plugin.name(), &handler.name, &e)
            }
            Err(payload) => {
                let fault = HandlerFault::from_panic(plugin.name(), &handler.name, payload);
                error!("Handler {}::{} panicked: {}", plugin.name(), handler.name, fault.message);
                fault
            }
        };

        self.report(&fault, sender, &target).await;
        Invocation::Faulted(fault)
    }

    async fn report(&self, fault: &HandlerFault, sender: &Sender, target: &str) {
        let text = format!(
            "{} {} {}",
            bold("ERR:"),
            color(&fault.error_line(), Color::Red),
            fault.location()
        );
        if let Err(e) = self.transport.reply(&sender.nick, &text, target).await {
            warn!("Could not report fault to {}: {}", sender.nick, e);
        }
    }

    async fn fallback(&self, key: &str, channel: &str) -> bool {
        let Some(store) = &self.store else {
            return false;
        };

        let message = match store.find_fallback_message(key, channel).await {
            Ok(Some(message)) => message,
            Ok(None) => return false,
            Err(e) => {
                warn!("Fallback lookup for {} in {} failed: {}", key, channel, e);
                return false;
            }
        };

        match self.transport.say(&message, channel).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not send fallback message to {}: {}", channel, e);
                false
            }
        }
    }
}
