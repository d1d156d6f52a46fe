//! Modules shipped with the crate

pub mod admin;
