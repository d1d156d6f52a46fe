//! Domain entities - Core business objects

pub mod handler;
pub mod message;
pub mod user;

pub use handler::{HandlerDescriptor, HandlerFn, MaxArgs, ParamSpec, ParamType, Trigger};
pub use message::{is_channel_name, Message};
pub use user::Sender;
