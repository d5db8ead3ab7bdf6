//! # tixaudit-core
//!
//! Compliance evaluation engine for work-tracking tickets.
//!
//! The engine audits immutable [`TicketSnapshot`]s against an organization's
//! process rules and produces a structured verdict per subject (one employee
//! over a reporting period, or one ticket) plus an executive summary and a
//! prioritized remediation list.
//!
//! ## Pipeline
//!
//! - [`classify`]: MIT vs non-MIT classification
//! - [`checks`]: one pure check per [`CriterionId`], in two tiers
//! - [`orchestrator`]: runs the checks for a subject with zero-tolerance
//!   short-circuiting
//! - [`aggregate`]: reduces many results to an [`ExecutiveSummary`] and
//!   [`Recommendation`]s
//!
//! Fetching, storing and rendering tickets are left to callers; the engine
//! performs no I/O apart from [`AuditConfig::from_file`].
//!
//! ## Example
//!
//! ```rust
//! use tixaudit_core::prelude::*;
//!
//! let tickets = vec![
//!     TicketSnapshot::builder("OPS-1")
//!         .status("Done")
//!         .reporter(Person::new("U1", "Lee"))
//!         .assignee(Person::new("U1", "Lee"))
//!         .history(vec![
//!             StatusChange::status("To Do", "In Progress", None),
//!             StatusChange::status("In Progress", "Done", None),
//!         ])
//!         .build()
//!         .unwrap(),
//! ];
//!
//! let config = AuditConfig::default();
//! let auditor = Auditor::new(config.clone());
//! let result = auditor.evaluate(&Subject::ticket("OPS-1", None), &tickets);
//!
//! assert_eq!(result.overall(), OverallVerdict::NonCompliant);
//! assert_eq!(
//!     result.criterion(CriterionId::RolesAndAccess).unwrap().reason(),
//!     "Reporter = Assignee"
//! );
//!
//! let (summary, recommendations) = aggregate(&[result], &config);
//! assert_eq!(summary.non_compliant, 1);
//! assert!(!recommendations.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod aggregate;
pub mod checks;
pub mod classify;
pub mod config;
pub mod criterion;
pub mod orchestrator;
pub mod result;
pub mod subject;
pub mod text;
pub mod ticket;

// Re-export main types at crate root for convenience
pub use aggregate::{aggregate, ExecutiveSummary, Priority, Recommendation};
pub use classify::{Classifier, MitStrategy, TicketClass};
pub use config::{AuditConfig, ConfigError};
pub use criterion::CriterionId;
pub use orchestrator::Auditor;
pub use result::{AuditResult, CheckResult, OverallVerdict, Severity, Verdict};
pub use subject::{AuditPeriod, Subject, SubjectTickets};
pub use ticket::{TicketSnapshot, TicketSnapshotBuilder};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::aggregate::{aggregate, ExecutiveSummary, Priority, Recommendation};
    pub use crate::classify::{Classifier, MitStrategy, TicketClass};
    pub use crate::config::{AuditConfig, ConfigError};
    pub use crate::criterion::{CriterionId, Tier};
    pub use crate::orchestrator::Auditor;
    pub use crate::result::{
        AuditResult, CheckResult, Evidence, OverallVerdict, Severity, Verdict,
        ZeroToleranceViolation,
    };
    pub use crate::subject::{employee_weeks, per_ticket, AuditPeriod, Subject, SubjectTickets};
    pub use crate::ticket::{Attachment, Comment, Person, StatusChange, TicketSnapshot};
}
