//! `tixaudit default-config`: prints the built-in configuration as TOML.

use anyhow::{Context, Result};
use tixaudit_core::config::AuditConfig;

/// Renders the default configuration.
pub fn render() -> Result<String> {
    AuditConfig::default()
        .to_toml()
        .context("failed to serialize default configuration")
}

/// Prints the default configuration to stdout.
pub fn run() -> Result<()> {
    print!("{}", render()?);
    Ok(())
}
