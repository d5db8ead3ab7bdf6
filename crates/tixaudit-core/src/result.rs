//! Check and audit result types.
//!
//! A [`CheckResult`] is the verdict of one criterion over one subject. An
//! [`AuditResult`] collects every criterion verdict for a subject together
//! with the zero-tolerance violations and the overall verdict.
//!
//! Verdict and severity are separate axes: the verdict says what happened,
//! the severity says how much it matters. A result is a zero-tolerance
//! violation exactly when it is a critical failure or a critical unknown.
//!
//! # Example
//!
//! ```rust
//! use tixaudit_core::criterion::CriterionId;
//! use tixaudit_core::result::{CheckResult, Severity, Verdict};
//!
//! let result = CheckResult::critical_unknown(
//!     CriterionId::TaskCancellation,
//!     "No approval or activity evidence for OPS-3",
//! );
//! assert_eq!(result.verdict(), Verdict::Unknown);
//! assert_eq!(result.severity(), Severity::CriticalUnknown);
//! assert!(result.zero_tolerance());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::criterion::CriterionId;
use crate::subject::{Subject, SubjectKind};
use crate::text;

/// Outcome of one criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The rule holds.
    Pass,
    /// The rule is violated.
    Fail,
    /// The rule does not apply to the subject.
    NotApplicable,
    /// The signal needed to decide was not supplied.
    Unknown,
    /// A human has to decide.
    NeedsManualReview,
}

/// How much a verdict matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Ordinary finding.
    #[default]
    Normal,
    /// A failure forces the subject to fail overall.
    Critical,
    /// Missing evidence for a zero-tolerance rule; treated like a critical
    /// failure.
    CriticalUnknown,
}

/// Errors raised when a serialized check result is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CheckResultError {
    /// The stored zero-tolerance flag disagrees with verdict and severity.
    #[error(
        "zero_tolerance flag {stored} inconsistent with verdict {verdict:?} and severity {severity:?}"
    )]
    ZeroToleranceMismatch {
        /// Flag as stored.
        stored: bool,
        /// Stored verdict.
        verdict: Verdict,
        /// Stored severity.
        severity: Severity,
    },

    /// `CriticalUnknown` severity on a verdict other than `Unknown`.
    #[error("critical_unknown severity requires an unknown verdict, got {verdict:?}")]
    CriticalUnknownVerdict {
        /// Stored verdict.
        verdict: Verdict,
    },
}

// ============================================================================
// Evidence
// ============================================================================

/// A pointer to the data a verdict was based on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Evidence {
    /// Ticket the evidence comes from.
    pub ticket_key: String,
    /// Field name (`status`, `comments`, `description`, ...).
    pub field: String,
    /// Value excerpt, at most [`text::MAX_SNIPPET_CHARS`] characters.
    pub value_snippet: String,
}

impl Evidence {
    /// Creates an evidence record, truncating the value.
    #[must_use]
    pub fn new(ticket_key: impl Into<String>, field: impl Into<String>, value: &str) -> Self {
        Self {
            ticket_key: ticket_key.into(),
            field: field.into(),
            value_snippet: text::snippet(value),
        }
    }
}

// ============================================================================
// CheckResult
// ============================================================================

/// Verdict of one criterion over one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CheckResultRecord", into = "CheckResultRecord")]
pub struct CheckResult {
    criterion: CriterionId,
    verdict: Verdict,
    severity: Severity,
    reason: String,
    evidence: Vec<Evidence>,
    gaps: Vec<String>,
}

impl CheckResult {
    fn new(criterion: CriterionId, verdict: Verdict, severity: Severity, reason: String) -> Self {
        Self {
            criterion,
            verdict,
            severity,
            reason,
            evidence: Vec::new(),
            gaps: Vec::new(),
        }
    }

    /// The rule holds.
    #[must_use]
    pub fn pass(criterion: CriterionId, reason: impl Into<String>) -> Self {
        Self::new(criterion, Verdict::Pass, Severity::Normal, reason.into())
    }

    /// The rule is violated.
    #[must_use]
    pub fn fail(criterion: CriterionId, reason: impl Into<String>) -> Self {
        Self::new(criterion, Verdict::Fail, Severity::Normal, reason.into())
    }

    /// A zero-tolerance rule is violated.
    #[must_use]
    pub fn critical_fail(criterion: CriterionId, reason: impl Into<String>) -> Self {
        Self::new(criterion, Verdict::Fail, Severity::Critical, reason.into())
    }

    /// Evidence for a zero-tolerance rule is missing.
    #[must_use]
    pub fn critical_unknown(criterion: CriterionId, reason: impl Into<String>) -> Self {
        Self::new(
            criterion,
            Verdict::Unknown,
            Severity::CriticalUnknown,
            reason.into(),
        )
    }

    /// The deciding signal was not supplied.
    #[must_use]
    pub fn unknown(criterion: CriterionId, reason: impl Into<String>) -> Self {
        Self::new(criterion, Verdict::Unknown, Severity::Normal, reason.into())
    }

    /// A human has to decide.
    #[must_use]
    pub fn manual_review(criterion: CriterionId, reason: impl Into<String>) -> Self {
        Self::new(
            criterion,
            Verdict::NeedsManualReview,
            Severity::Normal,
            reason.into(),
        )
    }

    /// The rule does not apply.
    #[must_use]
    pub fn not_applicable(criterion: CriterionId, reason: impl Into<String>) -> Self {
        Self::new(
            criterion,
            Verdict::NotApplicable,
            Severity::Normal,
            reason.into(),
        )
    }

    /// Adds one evidence record.
    #[must_use]
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    /// Adds several evidence records.
    #[must_use]
    pub fn with_evidence_all(mut self, evidence: impl IntoIterator<Item = Evidence>) -> Self {
        self.evidence.extend(evidence);
        self
    }

    /// Adds a soft finding that does not change the verdict.
    #[must_use]
    pub fn with_gap(mut self, gap: impl Into<String>) -> Self {
        self.gaps.push(gap.into());
        self
    }

    /// Adds several soft findings.
    #[must_use]
    pub fn with_gaps(mut self, gaps: impl IntoIterator<Item = String>) -> Self {
        self.gaps.extend(gaps);
        self
    }

    /// Criterion this result is for.
    #[must_use]
    pub const fn criterion(&self) -> CriterionId {
        self.criterion
    }

    /// Human label of the criterion.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.criterion.label()
    }

    /// Verdict.
    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Reason text.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Evidence records.
    #[must_use]
    pub fn evidence(&self) -> &[Evidence] {
        &self.evidence
    }

    /// Soft findings.
    #[must_use]
    pub fn gaps(&self) -> &[String] {
        &self.gaps
    }

    /// Returns `true` if the verdict is `Fail`.
    #[must_use]
    pub const fn is_fail(&self) -> bool {
        matches!(self.verdict, Verdict::Fail)
    }

    /// Returns `true` if this result is a zero-tolerance violation.
    #[must_use]
    pub const fn zero_tolerance(&self) -> bool {
        zero_tolerance_of(self.verdict, self.severity)
    }
}

const fn zero_tolerance_of(verdict: Verdict, severity: Severity) -> bool {
    matches!(
        (verdict, severity),
        (Verdict::Fail, Severity::Critical) | (_, Severity::CriticalUnknown)
    )
}

/// Wire form of [`CheckResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CheckResultRecord {
    criterion: CriterionId,
    label: String,
    verdict: Verdict,
    #[serde(default)]
    severity: Severity,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    evidence: Vec<Evidence>,
    #[serde(default)]
    gaps: Vec<String>,
    zero_tolerance: bool,
}

impl From<CheckResult> for CheckResultRecord {
    fn from(result: CheckResult) -> Self {
        Self {
            criterion: result.criterion,
            label: result.criterion.label().to_string(),
            verdict: result.verdict,
            severity: result.severity,
            zero_tolerance: result.zero_tolerance(),
            reason: result.reason,
            evidence: result.evidence,
            gaps: result.gaps,
        }
    }
}

impl TryFrom<CheckResultRecord> for CheckResult {
    type Error = CheckResultError;

    fn try_from(record: CheckResultRecord) -> Result<Self, Self::Error> {
        if record.severity == Severity::CriticalUnknown && record.verdict != Verdict::Unknown {
            return Err(CheckResultError::CriticalUnknownVerdict {
                verdict: record.verdict,
            });
        }
        if record.zero_tolerance != zero_tolerance_of(record.verdict, record.severity) {
            return Err(CheckResultError::ZeroToleranceMismatch {
                stored: record.zero_tolerance,
                verdict: record.verdict,
                severity: record.severity,
            });
        }
        Ok(Self {
            criterion: record.criterion,
            verdict: record.verdict,
            severity: record.severity,
            reason: record.reason,
            evidence: record.evidence,
            gaps: record.gaps,
        })
    }
}

// ============================================================================
// AuditResult
// ============================================================================

/// Overall verdict of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallVerdict {
    /// No failures.
    Compliant,
    /// At least one ordinary failure.
    NonCompliant,
    /// At least one zero-tolerance violation.
    ZeroToleranceFail,
    /// Ticket data could not be obtained.
    Error,
}

/// A recorded zero-tolerance violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZeroToleranceViolation {
    /// Criterion that raised it.
    pub criterion: CriterionId,
    /// Reason copied from the check result.
    pub reason: String,
}

/// All verdicts for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditResult {
    subject: Subject,
    criteria: BTreeMap<CriterionId, CheckResult>,
    violations: Vec<ZeroToleranceViolation>,
    overall: OverallVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default)]
    halted: bool,
}

impl AuditResult {
    /// Result for a subject whose ticket data could not be fetched.
    #[must_use]
    pub fn upstream_error(subject: Subject, error: impl Into<String>) -> Self {
        Self {
            subject,
            criteria: BTreeMap::new(),
            violations: Vec::new(),
            overall: OverallVerdict::Error,
            error: Some(error.into()),
            halted: false,
        }
    }

    /// Assembles a result from evaluated criteria; the overall verdict is
    /// derived.
    pub(crate) fn evaluated(
        subject: Subject,
        criteria: BTreeMap<CriterionId, CheckResult>,
        violations: Vec<ZeroToleranceViolation>,
        halted: bool,
    ) -> Self {
        let overall = if !violations.is_empty() {
            OverallVerdict::ZeroToleranceFail
        } else if criteria.values().any(CheckResult::is_fail) {
            OverallVerdict::NonCompliant
        } else {
            OverallVerdict::Compliant
        };
        Self {
            subject,
            criteria,
            violations,
            overall,
            error: None,
            halted,
        }
    }

    /// Subject identifier, derived from the subject.
    #[must_use]
    pub fn subject_id(&self) -> String {
        self.subject.id()
    }

    /// Subject kind.
    #[must_use]
    pub const fn subject_kind(&self) -> SubjectKind {
        self.subject.kind()
    }

    /// The audited subject.
    #[must_use]
    pub const fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Per-criterion results in evaluation order.
    #[must_use]
    pub const fn criteria(&self) -> &BTreeMap<CriterionId, CheckResult> {
        &self.criteria
    }

    /// Result for one criterion, if it was recorded.
    #[must_use]
    pub fn criterion(&self, id: CriterionId) -> Option<&CheckResult> {
        self.criteria.get(&id)
    }

    /// Zero-tolerance violations in the order they were raised.
    #[must_use]
    pub fn violations(&self) -> &[ZeroToleranceViolation] {
        &self.violations
    }

    /// Overall verdict.
    #[must_use]
    pub const fn overall(&self) -> OverallVerdict {
        self.overall
    }

    /// Upstream error text for `Error` results.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns `true` if evaluation stopped at a zero-tolerance violation.
    #[must_use]
    pub const fn halted(&self) -> bool {
        self.halted
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_zero_tolerance_flag() {
        assert!(CheckResult::critical_fail(CriterionId::TaskCancellation, "x").zero_tolerance());
        assert!(CheckResult::critical_unknown(CriterionId::TaskCancellation, "x").zero_tolerance());
        assert!(!CheckResult::fail(CriterionId::TaskCancellation, "x").zero_tolerance());
        assert!(!CheckResult::unknown(CriterionId::HistoryIntegrity, "x").zero_tolerance());
    }

    #[test]
    fn test_evidence_snippet_is_truncated() {
        let long = "x".repeat(1000);
        let evidence = Evidence::new("OPS-1", "description", &long);
        assert_eq!(evidence.value_snippet.len(), text::MAX_SNIPPET_CHARS);
    }

    #[test]
    fn test_serialized_form_carries_label_and_flag() {
        let result = CheckResult::fail(CriterionId::RolesAndAccess, "Reporter = Assignee")
            .with_evidence(Evidence::new("OPS-1", "assignee", "U1"));
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["criterion"], "roles_and_access");
        assert_eq!(value["label"], "Role Ownership");
        assert_eq!(value["verdict"], "fail");
        assert_eq!(value["zero_tolerance"], false);

        let back: CheckResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_deserialize_rejects_inconsistent_flag() {
        let raw = json!({
            "criterion": "task_cancellation",
            "label": "Task Cancellation",
            "verdict": "fail",
            "severity": "critical",
            "zero_tolerance": false
        });
        let err = serde_json::from_value::<CheckResult>(raw).unwrap_err();
        assert!(err.to_string().contains("inconsistent"));
    }

    #[test]
    fn test_deserialize_rejects_critical_unknown_pass() {
        let raw = json!({
            "criterion": "task_cancellation",
            "label": "Task Cancellation",
            "verdict": "pass",
            "severity": "critical_unknown",
            "zero_tolerance": true
        });
        assert!(serde_json::from_value::<CheckResult>(raw).is_err());
    }

    #[test]
    fn test_overall_verdict_derivation() {
        let subject = Subject::ticket("OPS-1", None);
        let mut criteria = BTreeMap::new();
        criteria.insert(
            CriterionId::RolesAndAccess,
            CheckResult::fail(CriterionId::RolesAndAccess, "Assignee missing"),
        );
        let result = AuditResult::evaluated(subject.clone(), criteria, Vec::new(), false);
        assert_eq!(result.overall(), OverallVerdict::NonCompliant);

        let violation = ZeroToleranceViolation {
            criterion: CriterionId::TaskCancellation,
            reason: "no approval".to_string(),
        };
        let result = AuditResult::evaluated(subject, BTreeMap::new(), vec![violation], true);
        assert_eq!(result.overall(), OverallVerdict::ZeroToleranceFail);
        assert!(result.halted());
    }

    #[test]
    fn test_upstream_error_has_no_criteria() {
        let result = AuditResult::upstream_error(Subject::ticket("OPS-9", None), "HTTP 500");
        assert_eq!(result.overall(), OverallVerdict::Error);
        assert!(result.criteria().is_empty());
        assert_eq!(result.error(), Some("HTTP 500"));
    }

    #[test]
    fn test_subject_identity_derived_from_subject() {
        let result = AuditResult::upstream_error(Subject::ticket("OPS-9", None), "HTTP 500");
        let json = serde_json::to_value(&result).unwrap();

        assert!(json.get("subject_id").is_none());
        assert!(json.get("subject_kind").is_none());
        assert_eq!(json["subject"]["kind"], "ticket");

        let restored: AuditResult = serde_json::from_value(json).unwrap();
        assert_eq!(restored.subject_id(), "OPS-9");
        assert_eq!(restored.subject_kind(), SubjectKind::Ticket);
        assert_eq!(restored, result);
    }
}
