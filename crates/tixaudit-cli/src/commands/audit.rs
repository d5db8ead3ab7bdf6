//! `tixaudit audit`: evaluates a ticket export and writes a JSON report.
//!
//! # Modes
//!
//! - `--by-ticket`: one subject per ticket.
//! - `--from DATE --to DATE`: one subject per employee and ISO week
//!   overlapping the range; idle employee-weeks are skipped.
//!
//! # Example
//!
//! ```bash
//! tixaudit audit --config audit.toml --tickets export.json --from 2026-01-19 --to 2026-01-25
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use tixaudit_core::prelude::*;
use tracing::info;

/// Maximum accepted size of a ticket export (64 MiB).
pub const MAX_TICKETS_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Arguments for `tixaudit audit`.
#[derive(Args, Debug, Clone)]
pub struct AuditArgs {
    /// Path to the audit configuration (TOML); defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the ticket export (JSON array or object with `issues`)
    #[arg(short, long)]
    pub tickets: PathBuf,

    /// Audit each ticket on its own
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub by_ticket: bool,

    /// First day of the reporting range (YYYY-MM-DD)
    #[arg(long, required_unless_present = "by_ticket", requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last day of the reporting range (YYYY-MM-DD)
    #[arg(long, required_unless_present = "by_ticket", requires = "from")]
    pub to: Option<NaiveDate>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Accepted shapes of a ticket export.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TicketExport {
    List(Vec<TicketSnapshot>),
    Wrapped { issues: Vec<TicketSnapshot> },
}

impl TicketExport {
    fn into_tickets(self) -> Vec<TicketSnapshot> {
        match self {
            Self::List(tickets) | Self::Wrapped { issues: tickets } => tickets,
        }
    }
}

/// JSON document written by `tixaudit audit`.
#[derive(Debug, Serialize)]
pub struct Report {
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// One result per subject, in subject order.
    pub results: Vec<AuditResult>,
    /// Batch roll-up.
    pub summary: ExecutiveSummary,
    /// Prioritized remediations.
    pub recommendations: Vec<Recommendation>,
}

/// Runs the audit command.
pub fn run(args: &AuditArgs) -> Result<()> {
    let report = build_report(args)?;
    let rendered =
        serde_json::to_string_pretty(&report).context("failed to serialize audit report")?;

    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Loads inputs, evaluates every subject and aggregates the results.
pub fn build_report(args: &AuditArgs) -> Result<Report> {
    let config = match &args.config {
        Some(path) => AuditConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AuditConfig::default(),
    };
    let tickets = load_tickets(&args.tickets)?;

    let subjects = if args.by_ticket {
        per_ticket(&tickets, None)
    } else {
        let (Some(from), Some(to)) = (args.from, args.to) else {
            bail!("--from and --to are required unless --by-ticket is given");
        };
        if from > to {
            bail!("--from {from} is after --to {to}");
        }
        employee_weeks(&tickets, from, to, config.cadence.offset())
    };
    info!(
        tickets = tickets.len(),
        subjects = subjects.len(),
        "Evaluating subjects"
    );

    let auditor = Auditor::new(config);
    let results = auditor.evaluate_batch(&subjects);
    let (summary, recommendations) = aggregate(&results, auditor.config());

    Ok(Report {
        generated_at: Utc::now(),
        results,
        summary,
        recommendations,
    })
}

fn load_tickets(path: &Path) -> Result<Vec<TicketSnapshot>> {
    let size = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    if size > MAX_TICKETS_FILE_SIZE {
        bail!(
            "ticket export {} is {size} bytes, limit is {MAX_TICKETS_FILE_SIZE}",
            path.display()
        );
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let export: TicketExport = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse ticket export {}", path.display()))?;
    Ok(export.into_tickets())
}
