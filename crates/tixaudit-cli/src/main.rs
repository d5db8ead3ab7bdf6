//! tixaudit - ticket compliance auditor
//!
//! Evaluates a ticket export against the configured process rules and
//! prints a JSON report.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;

/// tixaudit - ticket compliance auditor
#[derive(Parser, Debug)]
#[command(name = "tixaudit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Audit a ticket export and write a JSON report
    Audit(commands::audit::AuditArgs),

    /// Print the default configuration as TOML
    DefaultConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Audit(args) => commands::audit::run(&args),
        Commands::DefaultConfig => commands::default_config::run(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_employee_mode() {
        let cli = Cli::try_parse_from([
            "tixaudit",
            "audit",
            "--tickets",
            "export.json",
            "--from",
            "2026-01-19",
            "--to",
            "2026-01-25",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "warn");
        let Commands::Audit(args) = cli.command else {
            panic!("Expected audit command");
        };
        assert_eq!(args.tickets, PathBuf::from("export.json"));
        assert!(!args.by_ticket);
        assert_eq!(args.from.map(|d| d.to_string()).as_deref(), Some("2026-01-19"));
    }

    #[test]
    fn test_parse_by_ticket_with_log_level() {
        let cli = Cli::try_parse_from([
            "tixaudit",
            "audit",
            "--tickets",
            "export.json",
            "--by-ticket",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        let Commands::Audit(args) = cli.command else {
            panic!("Expected audit command");
        };
        assert!(args.by_ticket);
        assert!(args.from.is_none());
    }

    #[test]
    fn test_mode_required() {
        let result = Cli::try_parse_from(["tixaudit", "audit", "--tickets", "export.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_by_ticket_conflicts_with_range() {
        let result = Cli::try_parse_from([
            "tixaudit",
            "audit",
            "--tickets",
            "export.json",
            "--by-ticket",
            "--from",
            "2026-01-19",
            "--to",
            "2026-01-25",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_default_config() {
        let cli = Cli::try_parse_from(["tixaudit", "default-config"]).unwrap();
        assert!(matches!(cli.command, Commands::DefaultConfig));
    }
}
