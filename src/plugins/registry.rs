//! Plugin registry - handles plugin lifecycle
//!
//! Loading spawns background loops as local tasks, so any plugin that
//! declares loops must be loaded from inside a `LocalSet`. A generation's
//! loops have always returned before its replacement becomes visible.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{info, warn};

use super::module::{Host, LoopContext, LoopFn};
use super::plugin::Plugin;
use crate::application::errors::PluginError;
use crate::infrastructure::config::Config;
use crate::infrastructure::plugins::PluginLoader;

/// Owns every loaded plugin, in load order
pub struct PluginRegistry {
    plugins: RefCell<IndexMap<String, Rc<Plugin>>>,
    loader: PluginLoader,
    host: Host,
}

impl PluginRegistry {
    pub fn new(loader: PluginLoader, host: Host) -> Self {
        Self {
            plugins: RefCell::new(IndexMap::new()),
            loader,
            host,
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn config(&self) -> &Config {
        &self.host.config
    }

    /// Load every plugin listed in the `plugins` config section
    ///
    /// # Panics
    ///
    /// Panics outside a `LocalSet` if a listed plugin declares background loops.
    pub fn load_all(&self) -> Result<(), PluginError> {
        let entries: Vec<(String, String)> = self
            .host
            .config
            .plugins()
            .map(|(name, path)| (name.to_string(), path.to_string()))
            .collect();

        for (name, module_path) in entries {
            self.load(&name, &module_path)?;
        }
        Ok(())
    }

    /// Build a plugin from `module_path` and register it under `name`.
    ///
    /// The plugin only becomes visible once its setup functions succeeded.
    /// Replacing a registered plugin goes through [`PluginRegistry::reload`].
    ///
    /// # Panics
    ///
    /// Panics outside a `LocalSet` if the module declares background loops.
    pub fn load(&self, name: &str, module_path: &str) -> Result<Rc<Plugin>, PluginError> {
        if self.is_loaded(name) {
            return Err(PluginError::AlreadyLoaded(name.to_string()));
        }
        let (plugin, loops) = self.build(name, module_path)?;
        self.activate(&plugin, &loops);
        Ok(plugin)
    }

    /// Stop the plugin's loops, then load it again from the same module path.
    ///
    /// Concurrent reloads of one plugin are serialized: each waits for the
    /// generation registered at that moment to stop before activating its own.
    /// If the new load fails the old, already cancelled, plugin stays registered.
    pub async fn reload(&self, name: &str) -> Result<Rc<Plugin>, PluginError> {
        let previous = self
            .get(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        let module_path = previous.module_path().to_string();

        self.retire(name, previous).await?;

        // nothing below awaits, so no other generation can slip in
        let (plugin, loops) = self.build(name, &module_path).map_err(|e| {
            warn!("Reload of plugin '{}' failed: {}", name, e);
            e
        })?;
        self.activate(&plugin, &loops);
        Ok(plugin)
    }

    /// Stop `current` and any generation registered under `name` meanwhile
    async fn retire(&self, name: &str, mut current: Rc<Plugin>) -> Result<(), PluginError> {
        loop {
            current.join_tasks().await;
            match self.get(name) {
                Some(latest) if Rc::ptr_eq(&latest, &current) => return Ok(()),
                Some(latest) => current = latest,
                None => return Err(PluginError::NotFound(name.to_string())),
            }
        }
    }

    /// Resolve the module and run its setup functions
    fn build(&self, name: &str, module_path: &str) -> Result<(Rc<Plugin>, Vec<LoopFn>), PluginError> {
        let module = self.loader.resolve(module_path)?;
        let config = self.host.config.plugin_section(name);
        let plugin = Rc::new(Plugin::new(name, module_path, module.handlers, config));

        for setup in &module.initials {
            setup(&plugin, &self.host).map_err(|e| PluginError::Setup {
                plugin: name.to_string(),
                reason: format!("{:#}", e),
            })?;
        }
        Ok((plugin, module.loops))
    }

    /// Register the plugin and start its loops
    fn activate(&self, plugin: &Rc<Plugin>, loops: &[LoopFn]) {
        self.plugins
            .borrow_mut()
            .insert(plugin.name().to_string(), Rc::clone(plugin));

        for background in loops {
            let ctx = LoopContext {
                host: self.host.clone(),
                plugin: Rc::clone(plugin),
                token: plugin.cancellation_token(),
            };
            plugin.spawn_loop(background(ctx));
        }

        info!(
            "Loaded plugin: {} from {} ({} handlers, instance {})",
            plugin.name(),
            plugin.module_path(),
            plugin.handlers().len(),
            plugin.instance_id()
        );
    }

    /// Remove a plugin and stop its loops
    pub async fn unload(&self, name: &str) -> Result<(), PluginError> {
        let plugin = self
            .plugins
            .borrow_mut()
            .shift_remove(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;

        plugin.join_tasks().await;
        info!("Unloaded plugin: {}", name);
        Ok(())
    }

    /// Cancel every plugin's loops and wait for them; used at teardown
    pub async fn shutdown_all(&self) {
        let plugins = self.snapshot();
        for plugin in &plugins {
            plugin.cancel();
        }
        for plugin in &plugins {
            plugin.join_tasks().await;
        }
        info!("Stopped background tasks of {} plugins", plugins.len());
    }

    pub fn get(&self, name: &str) -> Option<Rc<Plugin>> {
        self.plugins.borrow().get(name).cloned()
    }

    /// Live plugins in resolution order
    pub fn snapshot(&self) -> Vec<Rc<Plugin>> {
        self.plugins.borrow().values().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.plugins.borrow().keys().cloned().collect()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.borrow().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.plugins.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::{BoundArgs, RequestContext};
    use crate::domain::entities::HandlerDescriptor;
    use crate::infrastructure::adapters::MemoryTransport;
    use crate::plugins::module::PluginModule;
    use std::cell::Cell;

    async fn noop(_ctx: RequestContext, _args: BoundArgs) -> anyhow::Result<()> {
        Ok(())
    }

    fn notes_module() -> Result<PluginModule, PluginError> {
        Ok(PluginModule::new()
            .with_handler(HandlerDescriptor::command("note", noop))
            .with_handler(HandlerDescriptor::command("notes", noop).private_only())
            .with_initial(|plugin, _host| {
                plugin.temp().set("loaded", true);
                Ok(())
            })
            .with_loop(|ctx: LoopContext| async move {
                ctx.token.cancelled().await;
                ctx.plugin.temp().set("stopped", true);
            }))
    }

    fn registry_with(loader: PluginLoader, config: Config) -> PluginRegistry {
        let host = Host::new(Rc::new(MemoryTransport::new()), Rc::new(config));
        PluginRegistry::new(loader, host)
    }

    fn registry() -> PluginRegistry {
        let mut config = Config::empty();
        config.set("plugins", "notes", "plugins.notes");
        config.set("plugin:notes", "whitelist", "#a");
        registry_with(PluginLoader::new().with_module("plugins.notes", notes_module), config)
    }

    #[tokio::test]
    async fn test_load_merges_config_and_runs_setup() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let registry = registry();
                registry.load_all().unwrap();

                let plugin = registry.get("notes").unwrap();
                assert_eq!(plugin.config().get("whitelist").map(String::as_str), Some("#a"));
                assert_eq!(plugin.temp().get("loaded"), Some(serde_json::Value::Bool(true)));
                assert_eq!(plugin.commands(), vec!["note", "notes"]);
                assert_eq!(plugin.task_count(), 1);

                registry.shutdown_all().await;
            })
            .await;
    }

    #[tokio::test]
    async fn test_reload_issues_new_generation() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let registry = registry();
                let old = registry.load("notes", "plugins.notes").unwrap();
                let old_token = old.cancellation_token();
                old.temp().set("scratch", 1);

                let new = registry.reload("notes").await.unwrap();

                assert!(old_token.is_cancelled());
                assert_eq!(old.temp().get("stopped"), Some(serde_json::Value::Bool(true)));
                assert!(!new.is_cancelled());
                assert_ne!(old.instance_id(), new.instance_id());
                assert_eq!(new.commands(), old.commands());
                assert_eq!(new.temp().get("scratch"), None);
                assert!(!new.temp().same_as(old.temp()));

                registry.shutdown_all().await;
                assert!(new.is_cancelled());
            })
            .await;
    }

    #[tokio::test]
    async fn test_unload_removes_and_cancels() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let registry = registry();
                let plugin = registry.load("notes", "plugins.notes").unwrap();

                registry.unload("notes").await.unwrap();
                assert!(plugin.is_cancelled());
                assert!(registry.is_empty());
                assert!(matches!(registry.unload("notes").await, Err(PluginError::NotFound(_))));
                assert!(matches!(registry.reload("notes").await, Err(PluginError::NotFound(_))));
            })
            .await;
    }

    #[test]
    fn test_failed_setup_registers_nothing() {
        let loader = PluginLoader::new().with_module("plugins.broken", || {
            Ok(PluginModule::new()
                .with_handler(HandlerDescriptor::command("broken", noop))
                .with_initial(|_plugin, _host| anyhow::bail!("missing api key")))
        });
        let registry = registry_with(loader, Config::empty());

        let err = registry.load("broken", "plugins.broken").unwrap_err();
        assert!(matches!(err, PluginError::Setup { .. }));
        assert!(!registry.is_loaded("broken"));
        assert!(matches!(
            registry.load("ghost", "plugins.ghost"),
            Err(PluginError::Load(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_generation() {
        let fail = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fail);
        let loader = PluginLoader::new().with_module("plugins.flaky", move || {
            if flag.get() {
                return Err(PluginError::Load("syntax error".into()));
            }
            Ok(PluginModule::new().with_handler(HandlerDescriptor::command("flaky", noop)))
        });
        let registry = registry_with(loader, Config::empty());

        let first = registry.load("flaky", "plugins.flaky").unwrap();
        fail.set(true);

        assert!(registry.reload("flaky").await.is_err());
        let current = registry.get("flaky").unwrap();
        assert_eq!(current.instance_id(), first.instance_id());
        assert!(current.is_cancelled());
    }

    #[tokio::test]
    async fn test_load_order_is_stable_across_reload() {
        let loader = PluginLoader::new()
            .with_module("a", || Ok(PluginModule::new()))
            .with_module("b", || Ok(PluginModule::new()));
        let registry = registry_with(loader, Config::empty());

        registry.load("first", "a").unwrap();
        registry.load("second", "b").unwrap();
        assert!(matches!(
            registry.load("first", "a"),
            Err(PluginError::AlreadyLoaded(_))
        ));
        registry.reload("first").await.unwrap();
        assert_eq!(registry.names(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_concurrent_reloads_never_overlap_generations() {
        let events = Rc::new(RefCell::new(Vec::<String>::new()));
        let generation = Rc::new(Cell::new(0));

        let log = Rc::clone(&events);
        let counter = Rc::clone(&generation);
        let loader = PluginLoader::new().with_module("plugins.slow", move || {
            counter.set(counter.get() + 1);
            let id = counter.get();
            let log = Rc::clone(&log);
            Ok(PluginModule::new().with_loop(move |ctx: LoopContext| {
                let log = Rc::clone(&log);
                async move {
                    log.borrow_mut().push(format!("start {}", id));
                    ctx.token.cancelled().await;
                    tokio::task::yield_now().await;
                    log.borrow_mut().push(format!("stop {}", id));
                }
            }))
        });

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let registry = registry_with(loader, Config::empty());
                registry.load("slow", "plugins.slow").unwrap();
                tokio::task::yield_now().await;

                let (a, b) = tokio::join!(registry.reload("slow"), registry.reload("slow"));
                let (a, b) = (a.unwrap(), b.unwrap());
                assert!(a.is_cancelled() != b.is_cancelled());

                registry.shutdown_all().await;
                assert_eq!(
                    *events.borrow(),
                    vec!["start 1", "stop 1", "start 2", "stop 2", "start 3", "stop 3"]
                );
            })
            .await;
    }
}
