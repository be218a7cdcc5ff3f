//! CLI command handlers.

pub mod bot;
pub mod composite;
pub mod config;
