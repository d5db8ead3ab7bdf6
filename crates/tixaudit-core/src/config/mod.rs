//! Engine configuration.
//!
//! [`AuditConfig`] is read from TOML. Every field has a default, so an empty
//! document is a valid configuration:
//!
//! ```toml
//! stop_on_zero_tolerance = true
//!
//! [workflow]
//! in_progress_status = "In Progress"
//! done_status = "Done"
//! cancelled_status = "Cancelled"
//!
//! [workflow.transitions]
//! "To Do" = ["In Progress", "Cancelled"]
//! "In Progress" = ["In Review", "Done", "Cancelled"]
//! "In Review" = ["In Progress", "Done"]
//! Done = []
//! Cancelled = []
//!
//! [cadence]
//! days = ["Wed", "Fri"]
//! utc_offset_minutes = 330
//!
//! [mit.strategy]
//! method = "label"
//! label = "MIT"
//!
//! [report.fixes]
//! weekly_updates = "Post the Wednesday and Friday update in the team channel ticket"
//! ```
//!
//! The configuration is immutable once loaded and is passed explicitly to
//! the [`Auditor`](crate::orchestrator::Auditor) and the aggregator.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{FixedOffset, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::classify::MitStrategy;
use crate::criterion::CriterionId;
use crate::text;

/// Largest accepted reporting offset, in minutes.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Largest accepted `mit.creation_deadline_days`.
pub const MAX_CREATION_DEADLINE_DAYS: u32 = 366;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Stop recording criteria after the first zero-tolerance violation.
    #[serde(default = "default_true")]
    pub stop_on_zero_tolerance: bool,

    /// Workflow states and transitions.
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Cancellation approval rules.
    #[serde(default)]
    pub cancellation: CancellationConfig,

    /// Weekly update cadence.
    #[serde(default)]
    pub cadence: CadenceConfig,

    /// Documentation requirements.
    #[serde(default)]
    pub documentation: DocumentationConfig,

    /// MIT classification and planning parameters.
    #[serde(default)]
    pub mit: MitConfig,

    /// Heuristic thresholds.
    #[serde(default)]
    pub heuristics: HeuristicsConfig,

    /// Report shaping.
    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            stop_on_zero_tolerance: true,
            workflow: WorkflowConfig::default(),
            cancellation: CancellationConfig::default(),
            cadence: CadenceConfig::default(),
            documentation: DocumentationConfig::default(),
            mit: MitConfig::default(),
            heuristics: HeuristicsConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or the values are
    /// inconsistent.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Rejects inconsistent values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workflow.in_progress_status.trim().is_empty()
            || self.workflow.done_status.trim().is_empty()
            || self.workflow.cancelled_status.trim().is_empty()
        {
            return Err(invalid("workflow status names must not be empty"));
        }
        if self.cancellation.window_hours == 0 {
            return Err(invalid("cancellation.window_hours must be positive"));
        }
        if blank(&self.cancellation.approval_tokens) {
            return Err(invalid("cancellation.approval_tokens must not be empty"));
        }
        if blank(&self.cancellation.authority_tokens) {
            return Err(invalid("cancellation.authority_tokens must not be empty"));
        }
        if self.cadence.days.is_empty() {
            return Err(invalid("cadence.days must not be empty"));
        }
        let distinct: BTreeSet<u32> = self
            .cadence
            .days
            .iter()
            .map(Weekday::num_days_from_monday)
            .collect();
        if distinct.len() != self.cadence.days.len() {
            return Err(invalid("cadence.days must not repeat a weekday"));
        }
        if self.cadence.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(invalid(format!(
                "cadence.utc_offset_minutes must be within +/-{MAX_UTC_OFFSET_MINUTES}"
            )));
        }
        if self.mit.min_planned > self.mit.max_planned {
            return Err(invalid(format!(
                "mit.min_planned ({}) exceeds mit.max_planned ({})",
                self.mit.min_planned, self.mit.max_planned
            )));
        }
        if self.mit.creation_deadline_days > MAX_CREATION_DEADLINE_DAYS {
            return Err(invalid(format!(
                "mit.creation_deadline_days must be at most {MAX_CREATION_DEADLINE_DAYS}"
            )));
        }
        if self.heuristics.min_title_length > self.heuristics.max_title_length {
            return Err(invalid(format!(
                "heuristics.min_title_length ({}) exceeds heuristics.max_title_length ({})",
                self.heuristics.min_title_length, self.heuristics.max_title_length
            )));
        }
        if self.heuristics.burst_threshold < 2 {
            return Err(invalid("heuristics.burst_threshold must be at least 2"));
        }
        if self.heuristics.burst_window_minutes == 0 {
            return Err(invalid("heuristics.burst_window_minutes must be positive"));
        }
        if self.heuristics.multiple_issue_items == 0 {
            return Err(invalid("heuristics.multiple_issue_items must be positive"));
        }
        if self.report.max_recommendations == 0 {
            return Err(invalid("report.max_recommendations must be positive"));
        }
        if let Some(unknown) = self
            .report
            .fixes
            .keys()
            .find(|key| !CriterionId::ALL.iter().any(|c| c.as_str() == key.as_str()))
        {
            return Err(invalid(format!("report.fixes: unknown criterion '{unknown}'")));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn blank(values: &[String]) -> bool {
    values.iter().all(|v| v.trim().is_empty())
}

const fn default_true() -> bool {
    true
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}

// ============================================================================
// Sections
// ============================================================================

/// Workflow states and legal transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Status the work is done in.
    pub in_progress_status: String,
    /// Completion status.
    pub done_status: String,
    /// Cancellation status.
    pub cancelled_status: String,
    /// Adjacency map: status -> statuses it may move to. Terminal states map
    /// to an empty list.
    pub transitions: BTreeMap<String, Vec<String>>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        let transitions = [
            ("To Do", &["In Progress", "Cancelled"][..]),
            (
                "In Progress",
                &["In Review", "Blocked", "Done", "To Do", "Cancelled"][..],
            ),
            ("In Review", &["In Progress", "Done", "Cancelled"][..]),
            ("Blocked", &["In Progress", "Cancelled"][..]),
            ("Done", &[][..]),
            ("Cancelled", &[][..]),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), strings(to)))
        .collect();

        Self {
            in_progress_status: "In Progress".to_string(),
            done_status: "Done".to_string(),
            cancelled_status: "Cancelled".to_string(),
            transitions,
        }
    }
}

/// Approval rules for cancelled tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CancellationConfig {
    /// Words naming someone entitled to approve (`manager`, `lead`).
    pub authority_tokens: Vec<String>,
    /// Words expressing approval.
    pub approval_tokens: Vec<String>,
    /// How close to the cancellation an authority approval must be.
    pub window_hours: u32,
}

impl Default for CancellationConfig {
    fn default() -> Self {
        Self {
            authority_tokens: strings(&["manager", "lead", "director", "supervisor"]),
            approval_tokens: strings(&[
                "approved",
                "approval",
                "sign-off",
                "signed off",
                "ok to cancel",
                "agreed to cancel",
            ]),
            window_hours: 48,
        }
    }
}

/// Weekly update cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CadenceConfig {
    /// Weekdays an update comment is expected on.
    pub days: Vec<Weekday>,
    /// Reporting offset from UTC used for every calendar-day decision.
    pub utc_offset_minutes: i32,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            days: vec![Weekday::Wed, Weekday::Fri],
            utc_offset_minutes: 0,
        }
    }
}

impl CadenceConfig {
    /// Reporting offset; UTC if the configured value is out of range.
    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Documentation requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentationConfig {
    /// Minimum description length in characters.
    pub min_description_length: usize,
    /// Fail tickets without a due date instead of reporting a gap.
    pub due_date_required: bool,
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        Self {
            min_description_length: 50,
            due_date_required: false,
        }
    }
}

/// MIT classification and planning parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MitConfig {
    /// Fewest MIT tickets per period.
    pub min_planned: usize,
    /// Most MIT tickets per period.
    pub max_planned: usize,
    /// Days after the period start by which MIT tickets must exist.
    pub creation_deadline_days: u32,
    /// Fewest active non-MIT tickets per period.
    pub min_non_mit_active: usize,
    /// Statuses counting as closed for MIT completion.
    pub closed_statuses: Vec<String>,
    /// How MIT tickets are recognized.
    pub strategy: MitStrategy,
}

impl Default for MitConfig {
    fn default() -> Self {
        Self {
            min_planned: 3,
            max_planned: 5,
            creation_deadline_days: 0,
            min_non_mit_active: 1,
            closed_statuses: strings(&["Done", "Closed", "Resolved"]),
            strategy: MitStrategy::default(),
        }
    }
}

impl MitConfig {
    /// Returns `true` if `status` counts as closed.
    #[must_use]
    pub fn is_closed(&self, status: &str) -> bool {
        self.closed_statuses.iter().any(|s| text::same_name(s, status))
    }
}

/// Heuristic thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeuristicsConfig {
    /// Fewest words in a substantive comment.
    pub min_comment_words: usize,
    /// Placeholder words that carry no information.
    pub generic_terms: Vec<String>,
    /// Shortest acceptable title, in characters.
    pub min_title_length: usize,
    /// Longest acceptable title, in characters.
    pub max_title_length: usize,
    /// Fewest words explaining a screenshot or link.
    pub min_explanation_words: usize,
    /// Status changes inside one window that count as a bulk rewrite.
    pub burst_threshold: usize,
    /// Width of the bulk-rewrite window.
    pub burst_window_minutes: u32,
    /// Custom fields holding acceptance criteria, tried in order.
    pub acceptance_criteria_fields: Vec<String>,
    /// Shortest plausible creation-to-resolution time.
    pub min_cycle_minutes: u32,
    /// List items in a description that suggest several issues.
    pub multiple_issue_items: usize,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            min_comment_words: 10,
            generic_terms: strings(&[
                "done",
                "updated",
                "update",
                "fixed",
                "wip",
                "ok",
                "na",
                "n/a",
                "tbd",
                "todo",
                "test",
                "see above",
                "in progress",
                "working on it",
            ]),
            min_title_length: 10,
            max_title_length: 100,
            min_explanation_words: 5,
            burst_threshold: 5,
            burst_window_minutes: 60,
            acceptance_criteria_fields: strings(&["acceptance_criteria", "Acceptance Criteria"]),
            min_cycle_minutes: 15,
            multiple_issue_items: 3,
        }
    }
}

/// Report shaping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Longest recommendation list.
    pub max_recommendations: usize,
    /// Suggested-fix overrides keyed by criterion id.
    pub fixes: BTreeMap<String, String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_recommendations: 10,
            fixes: BTreeMap::new(),
        }
    }
}

impl ReportConfig {
    /// Suggested fix for a criterion: the override if configured, else the
    /// built-in text.
    #[must_use]
    pub fn fix_for(&self, criterion: CriterionId) -> &str {
        self.fixes
            .get(criterion.as_str())
            .map_or_else(|| criterion.default_fix(), String::as_str)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = AuditConfig::from_toml("").unwrap();
        assert_eq!(config, AuditConfig::default());
        assert!(config.stop_on_zero_tolerance);
        assert_eq!(config.cadence.days, vec![Weekday::Wed, Weekday::Fri]);
        assert_eq!(config.mit.min_planned, 3);
        assert_eq!(config.mit.max_planned, 5);
    }

    #[test]
    fn test_parse_sections() {
        let toml = r#"
            stop_on_zero_tolerance = false

            [workflow]
            done_status = "Closed"

            [workflow.transitions]
            "To Do" = ["In Progress"]
            "In Progress" = ["Closed"]
            Closed = []

            [cadence]
            days = ["Mon", "Thu"]
            utc_offset_minutes = 330

            [mit]
            max_planned = 4

            [mit.strategy]
            method = "issue_type"
            name = "Priority Task"

            [report.fixes]
            weekly_updates = "Update the ticket twice a week"
        "#;

        let config = AuditConfig::from_toml(toml).unwrap();
        assert!(!config.stop_on_zero_tolerance);
        assert_eq!(config.workflow.done_status, "Closed");
        assert_eq!(config.workflow.in_progress_status, "In Progress");
        assert_eq!(config.workflow.transitions.len(), 3);
        assert_eq!(config.cadence.days, vec![Weekday::Mon, Weekday::Thu]);
        assert_eq!(config.cadence.offset().local_minus_utc(), 330 * 60);
        assert_eq!(config.mit.max_planned, 4);
        assert_eq!(config.mit.min_planned, 3);
        assert!(matches!(config.mit.strategy, MitStrategy::IssueType { .. }));
        assert_eq!(
            config.report.fix_for(CriterionId::WeeklyUpdates),
            "Update the ticket twice a week"
        );
        assert_eq!(
            config.report.fix_for(CriterionId::TitleQuality),
            CriterionId::TitleQuality.default_fix()
        );
    }

    #[test]
    fn test_reject_min_above_max() {
        let err = AuditConfig::from_toml("[mit]\nmin_planned = 6\n").unwrap_err();
        match err {
            ConfigError::Validation(msg) => {
                assert!(msg.contains("mit.min_planned"), "unexpected message: {msg}");
            },
            _ => panic!("Expected ConfigError::Validation, got {err:?}"),
        }
    }

    #[test]
    fn test_reject_repeated_cadence_day() {
        let err = AuditConfig::from_toml("[cadence]\ndays = [\"Wed\", \"Wed\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_reject_oversized_creation_deadline() {
        let err = AuditConfig::from_toml("[mit]\ncreation_deadline_days = 4000000000\n").unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(ref msg) if msg.contains("creation_deadline_days")),
            "unexpected error: {err:?}"
        );
        assert!(AuditConfig::from_toml("[mit]\ncreation_deadline_days = 366\n").is_ok());
    }

    #[test]
    fn test_reject_unknown_fix_key() {
        let err = AuditConfig::from_toml("[report.fixes]\nnot_a_rule = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("not_a_rule")));
    }

    #[test]
    fn test_reject_unknown_section() {
        let err = AuditConfig::from_toml("[scheduler]\ncron = \"* * *\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AuditConfig::default();
        let rendered = config.to_toml().unwrap();
        assert_eq!(AuditConfig::from_toml(&rendered).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[documentation]\nmin_description_length = 80").unwrap();

        let config = AuditConfig::from_file(file.path()).unwrap();
        assert_eq!(config.documentation.min_description_length, 80);
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AuditConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
