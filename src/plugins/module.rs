//! Plugin modules - what a module path resolves to

use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use tokio_util::sync::CancellationToken;

use super::plugin::Plugin;
use crate::domain::entities::HandlerDescriptor;
use crate::domain::traits::Transport;
use crate::infrastructure::config::Config;

/// Services a plugin can reach during setup and in its loops
#[derive(Clone)]
pub struct Host {
    pub transport: Rc<dyn Transport>,
    pub config: Rc<Config>,
}

impl Host {
    pub fn new(transport: Rc<dyn Transport>, config: Rc<Config>) -> Self {
        Self { transport, config }
    }
}

/// Runs once per load, before the plugin becomes visible
pub type InitialFn = Rc<dyn Fn(&Plugin, &Host) -> anyhow::Result<()>>;

/// Long-running background loop, one task per load
pub type LoopFn = Rc<dyn Fn(LoopContext) -> LocalBoxFuture<'static, ()>>;

/// Handed to a background loop when it is spawned
#[derive(Clone)]
pub struct LoopContext {
    pub host: Host,
    pub plugin: Rc<Plugin>,
    /// Fires on reload, unload and shutdown
    pub token: CancellationToken,
}

/// Everything a module path provides: handlers, setup functions, loops
#[derive(Default, Clone)]
pub struct PluginModule {
    pub handlers: Vec<HandlerDescriptor>,
    pub initials: Vec<InitialFn>,
    pub loops: Vec<LoopFn>,
}

impl std::fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginModule")
            .field("handlers", &self.handlers.len())
            .field("initials", &self.initials.len())
            .field("loops", &self.loops.len())
            .finish()
    }
}

impl PluginModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, handler: HandlerDescriptor) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn with_initial<F>(mut self, setup: F) -> Self
    where
        F: Fn(&Plugin, &Host) -> anyhow::Result<()> + 'static,
    {
        self.initials.push(Rc::new(setup));
        self
    }

    pub fn with_loop<F, Fut>(mut self, background: F) -> Self
    where
        F: Fn(LoopContext) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.loops
            .push(Rc::new(move |ctx| background(ctx).boxed_local()));
        self
    }
}
