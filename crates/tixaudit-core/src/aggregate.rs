//! Executive summary and remediation recommendations.
//!
//! [`aggregate`] is a pure reduction over finished [`AuditResult`]s:
//!
//! - the [`ExecutiveSummary`] counts overall verdicts and indexes
//!   zero-tolerance violations by criterion,
//! - the [`Recommendation`] list groups failures by criterion, most frequent
//!   first, ties in criterion declaration order, capped at
//!   `report.max_recommendations`.
//!
//! A zero-tolerance critical unknown counts as a failure of its criterion.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AuditConfig;
use crate::criterion::CriterionId;
use crate::result::{AuditResult, OverallVerdict, Verdict};

/// Maximum number of example failures attached to a recommendation.
pub const MAX_EXAMPLES: usize = 3;

/// Failure count above which a recommendation is high priority.
pub const HIGH_PRIORITY_THRESHOLD: usize = 3;

/// Roll-up of a batch of audit results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutiveSummary {
    /// Subjects audited, including errors.
    pub total: usize,
    /// Subjects without failures.
    pub compliant: usize,
    /// Subjects with ordinary failures only.
    pub non_compliant: usize,
    /// Subjects with a zero-tolerance violation.
    pub zero_tolerance_fail: usize,
    /// Subjects whose data could not be fetched.
    pub error: usize,
    /// `compliant / (total - error)`; 0 when nothing was evaluated.
    pub compliance_rate: f64,
    /// Criterion -> subjects that violated it, in input order.
    pub zero_tolerance_index: BTreeMap<CriterionId, Vec<String>>,
    /// Criterion results resolved `Unknown`.
    pub unknown_results: usize,
    /// Criterion results resolved `NeedsManualReview`.
    pub manual_review_results: usize,
}

/// Recommendation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Zero-tolerance criterion.
    Critical,
    /// Frequent failure.
    High,
    /// Occasional failure.
    Medium,
}

/// One failing subject quoted in a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureExample {
    /// Subject identifier.
    pub subject_id: String,
    /// Reason from the failing check.
    pub reason: String,
}

/// A prioritized remediation for one failing criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recommendation {
    /// Position in the list (1 = most frequent).
    pub rank: usize,
    /// Criterion that failed.
    pub criterion: CriterionId,
    /// Criterion label.
    pub label: String,
    /// Category label.
    pub category: String,
    /// Number of failing subjects.
    pub failure_count: usize,
    /// Whether the criterion carries zero-tolerance semantics.
    pub zero_tolerance: bool,
    /// Priority.
    pub priority: Priority,
    /// What a failure looks like.
    pub issue: String,
    /// Suggested fix.
    pub suggested_fix: String,
    /// Up to [`MAX_EXAMPLES`] failing subjects.
    pub examples: Vec<FailureExample>,
}

#[derive(Default)]
struct Tally {
    count: usize,
    examples: Vec<FailureExample>,
}

/// Reduces audit results to a summary and recommendations.
#[must_use]
pub fn aggregate(
    results: &[AuditResult],
    config: &AuditConfig,
) -> (ExecutiveSummary, Vec<Recommendation>) {
    let summary = summarize(results);
    let recommendations = recommend(results, config);
    info!(
        total = summary.total,
        compliant = summary.compliant,
        zero_tolerance_fail = summary.zero_tolerance_fail,
        recommendations = recommendations.len(),
        "Aggregated audit results"
    );
    (summary, recommendations)
}

fn summarize(results: &[AuditResult]) -> ExecutiveSummary {
    let count = |verdict: OverallVerdict| results.iter().filter(|r| r.overall() == verdict).count();
    let total = results.len();
    let compliant = count(OverallVerdict::Compliant);
    let error = count(OverallVerdict::Error);

    let evaluated = total - error;
    #[allow(clippy::cast_precision_loss)]
    let compliance_rate = if evaluated == 0 {
        0.0
    } else {
        compliant as f64 / evaluated as f64
    };

    let mut zero_tolerance_index: BTreeMap<CriterionId, Vec<String>> = BTreeMap::new();
    for result in results {
        let subject_id = result.subject_id();
        for violation in result.violations() {
            let subjects = zero_tolerance_index.entry(violation.criterion).or_default();
            if !subjects.contains(&subject_id) {
                subjects.push(subject_id.clone());
            }
        }
    }

    let verdicts = || results.iter().flat_map(|r| r.criteria().values());
    ExecutiveSummary {
        total,
        compliant,
        non_compliant: count(OverallVerdict::NonCompliant),
        zero_tolerance_fail: count(OverallVerdict::ZeroToleranceFail),
        error,
        compliance_rate,
        zero_tolerance_index,
        unknown_results: verdicts().filter(|c| c.verdict() == Verdict::Unknown).count(),
        manual_review_results: verdicts()
            .filter(|c| c.verdict() == Verdict::NeedsManualReview)
            .count(),
    }
}

fn recommend(results: &[AuditResult], config: &AuditConfig) -> Vec<Recommendation> {
    let mut tallies: BTreeMap<CriterionId, Tally> = BTreeMap::new();
    for result in results {
        for check in result.criteria().values() {
            if !check.is_fail() && !check.zero_tolerance() {
                continue;
            }
            let tally = tallies.entry(check.criterion()).or_default();
            tally.count += 1;
            if tally.examples.len() < MAX_EXAMPLES {
                tally.examples.push(FailureExample {
                    subject_id: result.subject_id(),
                    reason: check.reason().to_string(),
                });
            }
        }
    }

    // BTreeMap yields declaration order; the stable sort keeps it for ties.
    let mut ranked: Vec<(CriterionId, Tally)> = tallies.into_iter().collect();
    ranked.sort_by_key(|(_, tally)| Reverse(tally.count));

    ranked
        .into_iter()
        .take(config.report.max_recommendations)
        .enumerate()
        .map(|(idx, (criterion, tally))| Recommendation {
            rank: idx + 1,
            criterion,
            label: criterion.label().to_string(),
            category: criterion.category().to_string(),
            failure_count: tally.count,
            zero_tolerance: criterion.is_zero_tolerance(),
            priority: priority(criterion, tally.count),
            issue: criterion.failure_description().to_string(),
            suggested_fix: config.report.fix_for(criterion).to_string(),
            examples: tally.examples,
        })
        .collect()
}

const fn priority(criterion: CriterionId, failures: usize) -> Priority {
    if criterion.is_zero_tolerance() {
        Priority::Critical
    } else if failures > HIGH_PRIORITY_THRESHOLD {
        Priority::High
    } else {
        Priority::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Auditor;
    use crate::subject::Subject;
    use crate::ticket::{Person, TicketSnapshot};

    fn evaluate(tickets: Vec<TicketSnapshot>) -> Vec<AuditResult> {
        let auditor = Auditor::new(AuditConfig::default());
        tickets
            .into_iter()
            .map(|t| auditor.evaluate(&Subject::ticket(t.key(), None), &[t]))
            .collect()
    }

    fn self_assigned(key: &str) -> TicketSnapshot {
        TicketSnapshot::builder(key)
            .reporter(Person::new("U1", "Lee"))
            .assignee(Person::new("U1", "Lee"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_batch() {
        let (summary, recommendations) = aggregate(&[], &AuditConfig::default());
        assert_eq!(summary.total, 0);
        assert!(summary.compliance_rate.abs() < f64::EPSILON);
        assert!(recommendations.is_empty());
    }

    #[test]
    fn test_errors_excluded_from_rate() {
        let mut results = evaluate(vec![TicketSnapshot::builder("A-1").build().unwrap()]);
        results.push(AuditResult::upstream_error(
            Subject::ticket("A-2", None),
            "HTTP 500",
        ));
        let (summary, _) = aggregate(&results, &AuditConfig::default());

        assert_eq!(summary.total, 2);
        assert_eq!(summary.error, 1);
        let expected = summary.compliant as f64;
        assert!((summary.compliance_rate - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_tolerance_index_and_priority() {
        let cancelled = TicketSnapshot::builder("C-1")
            .status("Cancelled")
            .comments(Vec::new())
            .build()
            .unwrap();
        let results = evaluate(vec![cancelled, self_assigned("R-1")]);
        let (summary, recommendations) = aggregate(&results, &AuditConfig::default());

        assert_eq!(summary.zero_tolerance_fail, 1);
        assert_eq!(
            summary.zero_tolerance_index.get(&CriterionId::TaskCancellation),
            Some(&vec!["C-1".to_string()])
        );
        let cancellation = recommendations
            .iter()
            .find(|r| r.criterion == CriterionId::TaskCancellation)
            .unwrap();
        assert_eq!(cancellation.priority, Priority::Critical);
        assert_eq!(cancellation.examples[0].subject_id, "C-1");
    }

    #[test]
    fn test_ranking_and_cap() {
        let tickets = (0..5).map(|i| self_assigned(&format!("R-{i}"))).collect();
        let results = evaluate(tickets);
        let mut config = AuditConfig::default();
        config.report.max_recommendations = 2;
        config
            .report
            .fixes
            .insert("roles_and_access".to_string(), "Assign someone else".to_string());

        let (_, recommendations) = aggregate(&results, &config);
        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations[0].rank, 1);
        assert!(recommendations[0].failure_count >= recommendations[1].failure_count);

        let roles = recommendations
            .iter()
            .find(|r| r.criterion == CriterionId::RolesAndAccess)
            .unwrap();
        assert_eq!(roles.failure_count, 5);
        assert_eq!(roles.priority, Priority::High);
        assert_eq!(roles.suggested_fix, "Assign someone else");
        assert_eq!(roles.examples.len(), MAX_EXAMPLES);
    }
}
