//! Domain traits - Abstractions for infrastructure implementations

pub mod store;
pub mod transport;

pub use store::MessageStore;
pub use transport::Transport;
