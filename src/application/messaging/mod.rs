//! Message handling - Resolution, argument binding and handler execution

pub mod args;
pub mod context;
pub mod dispatcher;
pub mod parser;
pub mod rate_limit;
pub mod resolver;

pub use args::{BoundArgs, RawArgs};
pub use context::RequestContext;
pub use dispatcher::{Dispatch, Dispatcher, Invocation};
pub use parser::{MessageParser, Mode};
pub use rate_limit::RateLimiter;
pub use resolver::Resolver;
