//! Application layer - Dispatch logic
//!
//! This layer contains:
//! - Errors: Domain-specific errors and handler faults
//! - Messaging: Line parsing, resolution, argument binding, dispatching

pub mod errors;
pub mod messaging;
