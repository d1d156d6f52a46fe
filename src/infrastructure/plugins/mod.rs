//! Plugin loading
//! 
//! Plugin modules are compiled into the binary and registered under a
//! module path; the registry asks the loader for a fresh module on every load.

pub mod loader;

pub use loader::{ModuleFactory, PluginLoader};
