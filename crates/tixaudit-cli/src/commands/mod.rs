//! Subcommand implementations.

pub mod audit;
pub mod default_config;
