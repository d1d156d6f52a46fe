//! Plugin loader - Resolves module paths to plugin modules

use std::collections::HashMap;
use std::rc::Rc;

use crate::application::errors::PluginError;
use crate::plugins::builtin;
use crate::plugins::module::PluginModule;

/// Builds a fresh module every time it is called
pub type ModuleFactory = Rc<dyn Fn() -> Result<PluginModule, PluginError>>;

/// Plugin loader.
///
/// Modules are compiled in, so "importing" a module path means calling its
/// factory again; each load gets freshly built handlers.
#[derive(Clone, Default)]
pub struct PluginLoader {
    modules: HashMap<String, ModuleFactory>,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that knows the modules shipped with the crate
    pub fn with_builtins() -> Self {
        Self::new().with_module(builtin::admin::MODULE_PATH, builtin::admin::module)
    }

    pub fn with_module<F>(mut self, path: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<PluginModule, PluginError> + 'static,
    {
        self.register(path, factory);
        self
    }

    /// Register (or replace) the factory behind `path`
    pub fn register<F>(&mut self, path: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<PluginModule, PluginError> + 'static,
    {
        self.modules.insert(path.into(), Rc::new(factory));
    }

    pub fn has_module(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }

    /// Build the module behind `path`
    pub fn resolve(&self, path: &str) -> Result<PluginModule, PluginError> {
        let factory = self
            .modules
            .get(path)
            .ok_or_else(|| PluginError::Load(format!("No module at path '{}'", path)))?;

        let module = factory()?;
        tracing::debug!(
            "Resolved module {} ({} handlers, {} setup, {} loops)",
            path,
            module.handlers.len(),
            module.initials.len(),
            module.loops.len()
        );
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_unknown_path_fails() {
        let loader = PluginLoader::new();
        let err = loader.resolve("plugins.missing").unwrap_err();
        assert!(matches!(err, PluginError::Load(_)));
    }

    #[test]
    fn test_factory_runs_on_every_resolve() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let loader = PluginLoader::new().with_module("plugins.empty", move || {
            counter.set(counter.get() + 1);
            Ok(PluginModule::new())
        });

        loader.resolve("plugins.empty").unwrap();
        loader.resolve("plugins.empty").unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_builtins_present() {
        assert!(PluginLoader::with_builtins().has_module(builtin::admin::MODULE_PATH));
    }
}
