//! carik-dispatch - plugin dispatch core for a chat bot
//!
//! Incoming chat lines are matched against the handlers of the loaded
//! plugins, either as commands (`!weather Warsaw`, `carik weather Warsaw`)
//! or by regular expression. Everything runs on one cooperative scheduler:
//! drive the [`Dispatcher`] from inside a `tokio::task::LocalSet`.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;

pub use application::errors::{BindError, BotError, ConfigError, HandlerFault, PluginError, StorageError};
pub use application::messaging::{BoundArgs, Dispatch, Dispatcher, Invocation, RequestContext};
pub use domain::entities::{HandlerDescriptor, MaxArgs, Message, ParamSpec, ParamType, Sender};
pub use infrastructure::config::Config;
pub use plugins::{Host, Plugin, PluginModule, PluginRegistry};
