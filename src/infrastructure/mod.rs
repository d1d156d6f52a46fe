//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: Fallback message store
//! - Format: IRC text formatting
//! - Adapters: Transport implementations (console, memory)
//! - Plugins: Module loading

pub mod adapters;
pub mod config;
pub mod format;
pub mod plugins;
pub mod storage;
