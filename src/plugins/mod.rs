//! Plugin system
//! 
//! A plugin is a named bundle of handlers built from a module, with its own
//! config section, scratch state and background loops.

pub mod builtin;
pub mod module;
pub mod plugin;
pub mod registry;

pub use module::{Host, LoopContext, PluginModule};
pub use plugin::{Plugin, PluginConfig, Temp};
pub use registry::PluginRegistry;
