//! Domain layer - Core business objects and collaborator abstractions
//! 
//! This layer contains:
//! - Entities: Sender, Message, HandlerDescriptor
//! - Traits: Abstractions for infrastructure (Transport, MessageStore)

pub mod entities;
pub mod traits;
