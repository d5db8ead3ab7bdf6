//! Per-subject evaluation with zero-tolerance short-circuiting.
//!
//! The [`Auditor`] runs every criterion in declaration order, automatable
//! tier first, over one subject's tickets and assembles an
//! [`AuditResult`]. Evaluation never fails: upstream fetch failures become
//! an `Error` result, missing signals become `Unknown`.
//!
//! # Example
//!
//! ```rust
//! use tixaudit_core::config::AuditConfig;
//! use tixaudit_core::orchestrator::Auditor;
//! use tixaudit_core::result::OverallVerdict;
//! use tixaudit_core::subject::Subject;
//!
//! let auditor = Auditor::new(AuditConfig::default());
//! let result = auditor.evaluate(&Subject::ticket("OPS-1", None), &[]);
//!
//! assert_eq!(result.overall(), OverallVerdict::Compliant);
//! ```

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::checks::{self, CheckContext, StatusGraph};
use crate::classify::{Classifier, TicketClass};
use crate::config::AuditConfig;
use crate::criterion::{Applicability, CriterionId, Tier};
use crate::result::{AuditResult, CheckResult, ZeroToleranceViolation};
use crate::subject::{Subject, SubjectTickets};
use crate::ticket::TicketSnapshot;

/// Immutable evaluation engine.
#[derive(Debug, Clone)]
pub struct Auditor {
    config: AuditConfig,
    graph: StatusGraph,
    classifier: Classifier,
}

/// Accumulates criterion results and the halt flag for one subject.
#[derive(Debug, Default)]
struct Accumulator {
    criteria: BTreeMap<CriterionId, CheckResult>,
    violations: Vec<ZeroToleranceViolation>,
    halted: bool,
}

impl Accumulator {
    fn record(&mut self, result: CheckResult, stop_on_zero_tolerance: bool) {
        if result.zero_tolerance() {
            self.violations.push(ZeroToleranceViolation {
                criterion: result.criterion(),
                reason: result.reason().to_string(),
            });
            if stop_on_zero_tolerance {
                self.halted = true;
            }
        }
        self.criteria.insert(result.criterion(), result);
    }
}

impl Auditor {
    /// Creates an auditor from a configuration.
    #[must_use]
    pub fn new(config: AuditConfig) -> Self {
        let graph = StatusGraph::from_config(&config.workflow);
        let classifier = Classifier::new(config.mit.strategy.clone());
        Self {
            config,
            graph,
            classifier,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Classifier in use.
    #[must_use]
    pub const fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Evaluates one subject.
    #[must_use]
    pub fn evaluate(&self, subject: &Subject, tickets: &[TicketSnapshot]) -> AuditResult {
        let subject_id = subject.id();
        if let Some(failed) = tickets.iter().find(|t| t.fetch_error().is_some()) {
            let error = failed.fetch_error().unwrap_or_default();
            warn!(
                subject = %subject_id,
                ticket = %failed.key(),
                error = %error,
                "Ticket data unavailable"
            );
            return AuditResult::upstream_error(
                subject.clone(),
                format!("{}: {error}", failed.key()),
            );
        }

        let class = self.subject_class(subject, tickets);
        let ctx = CheckContext {
            config: &self.config,
            subject,
            tickets,
            graph: &self.graph,
            classifier: &self.classifier,
        };

        let mut acc = Accumulator::default();
        for tier in [Tier::Automatable, Tier::Heuristic] {
            for criterion in CriterionId::in_tier(tier) {
                if acc.halted {
                    break;
                }
                let result = match inapplicable(criterion, class) {
                    Some(reason) => CheckResult::not_applicable(criterion, reason),
                    None => checks::run(criterion, &ctx),
                };
                debug!(
                    subject = %subject_id,
                    criterion = %criterion,
                    verdict = ?result.verdict(),
                    "Criterion evaluated"
                );
                acc.record(result, self.config.stop_on_zero_tolerance);
            }
        }

        let result = AuditResult::evaluated(
            subject.clone(),
            acc.criteria,
            acc.violations,
            acc.halted,
        );
        info!(
            subject = %subject_id,
            tickets = tickets.len(),
            overall = ?result.overall(),
            violations = result.violations().len(),
            halted = result.halted(),
            "Subject evaluated"
        );
        result
    }

    /// Evaluates subjects in parallel; results keep input order.
    #[must_use]
    pub fn evaluate_batch(&self, subjects: &[SubjectTickets]) -> Vec<AuditResult> {
        subjects
            .par_iter()
            .map(|s| self.evaluate(&s.subject, &s.tickets))
            .collect()
    }

    /// A ticket subject takes its ticket's class; employee subjects are
    /// mixed.
    fn subject_class(&self, subject: &Subject, tickets: &[TicketSnapshot]) -> Option<TicketClass> {
        match subject {
            Subject::Employee { .. } => None,
            Subject::Ticket { .. } => tickets.first().map(|t| self.classifier.classify(t)),
        }
    }
}

fn inapplicable(criterion: CriterionId, class: Option<TicketClass>) -> Option<&'static str> {
    match (criterion.applicability(), class) {
        (Applicability::MitOnly, Some(TicketClass::NonMit)) => Some("Not a MIT ticket"),
        (Applicability::NonMitOnly, Some(TicketClass::Mit)) => Some("MIT ticket"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::result::{OverallVerdict, Severity, Verdict};
    use crate::ticket::{Person, StatusChange};

    fn cancelled_without_evidence(key: &str) -> TicketSnapshot {
        TicketSnapshot::builder(key)
            .status("Cancelled")
            .comments(Vec::new())
            .build()
            .unwrap()
    }

    #[test]
    fn test_fetch_error_short_circuits() {
        let auditor = Auditor::new(AuditConfig::default());
        let tickets = vec![
            TicketSnapshot::builder("OPS-1").build().unwrap(),
            TicketSnapshot::fetch_failed("OPS-2", "HTTP 503"),
        ];
        let result = auditor.evaluate(&Subject::ticket("OPS-2", None), &tickets);

        assert_eq!(result.overall(), OverallVerdict::Error);
        assert_eq!(result.error(), Some("OPS-2: HTTP 503"));
        assert!(result.criteria().is_empty());
    }

    #[test]
    fn test_halt_stops_recording() {
        let auditor = Auditor::new(AuditConfig::default());
        let ticket = cancelled_without_evidence("OPS-3");
        let result = auditor.evaluate(&Subject::ticket("OPS-3", None), &[ticket]);

        assert_eq!(result.overall(), OverallVerdict::ZeroToleranceFail);
        assert!(result.halted());
        let last = result.criteria().keys().next_back().copied();
        assert_eq!(last, Some(CriterionId::TaskCancellation));
        assert!(result.criterion(CriterionId::WeeklyUpdates).is_none());
        assert!(result.criterion(CriterionId::CommentQuality).is_none());
    }

    /// Done ticket whose status flipped `changes` times, one minute apart.
    fn bulk_rewritten(key: &str, changes: i64) -> TicketSnapshot {
        let start = Utc.with_ymd_and_hms(2026, 1, 23, 17, 0, 0).unwrap();
        let mut builder = TicketSnapshot::builder(key)
            .status("Done")
            .reporter(Person::new("U1", "Lee"))
            .assignee(Person::new("U2", "Dana"));
        for i in 0..changes {
            builder = builder.change(StatusChange::status(
                "In Progress",
                "In Review",
                Some(start + Duration::minutes(i)),
            ));
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_halt_in_heuristic_tier() {
        let auditor = Auditor::new(AuditConfig::default());
        let ticket = bulk_rewritten("OPS-6", 5);
        let result = auditor.evaluate(&Subject::ticket("OPS-6", None), &[ticket]);

        assert!(result.halted());
        assert_eq!(result.overall(), OverallVerdict::ZeroToleranceFail);
        assert_eq!(result.violations()[0].criterion, CriterionId::HistoryIntegrity);
        let last = result.criteria().keys().next_back().copied();
        assert_eq!(last, Some(CriterionId::HistoryIntegrity));
        assert!(result.criterion(CriterionId::CommentQuality).is_some());
        for later in [
            CriterionId::AcceptanceCriteriaRelevance,
            CriterionId::ProductivityValidity,
            CriterionId::EvidenceRelevance,
        ] {
            assert!(result.criterion(later).is_none(), "{later} recorded after halt");
        }
    }

    #[test]
    fn test_burst_threshold_below_two_is_clamped() {
        let mut config = AuditConfig::default();
        config.heuristics.burst_threshold = 0;
        let auditor = Auditor::new(config);
        let ticket = bulk_rewritten("OPS-7", 2);
        let result = auditor.evaluate(&Subject::ticket("OPS-7", None), &[ticket]);

        let history = result.criterion(CriterionId::HistoryIntegrity).unwrap();
        assert_eq!(history.verdict(), Verdict::Fail);
        assert_eq!(history.severity(), Severity::Critical);
    }

    #[test]
    fn test_no_halt_records_everything() {
        let mut config = AuditConfig::default();
        config.stop_on_zero_tolerance = false;
        let auditor = Auditor::new(config);
        let ticket = cancelled_without_evidence("OPS-3");
        let result = auditor.evaluate(&Subject::ticket("OPS-3", None), &[ticket]);

        assert_eq!(result.overall(), OverallVerdict::ZeroToleranceFail);
        assert!(!result.halted());
        assert_eq!(result.criteria().len(), CriterionId::ALL.len());
        assert_eq!(result.violations().len(), 1);
    }

    #[test]
    fn test_mit_criteria_not_applicable_to_non_mit_ticket() {
        let auditor = Auditor::new(AuditConfig::default());
        let ticket = TicketSnapshot::builder("OPS-4").status("To Do").build().unwrap();
        let result = auditor.evaluate(&Subject::ticket("OPS-4", None), &[ticket]);

        let completion = result.criterion(CriterionId::MitCompletion).unwrap();
        assert_eq!(completion.verdict(), Verdict::NotApplicable);
        assert_eq!(completion.reason(), "Not a MIT ticket");
    }

    #[test]
    fn test_criteria_in_declaration_order() {
        let auditor = Auditor::new(AuditConfig::default());
        let ticket = TicketSnapshot::builder("OPS-5")
            .reporter(Person::new("U1", "Lee"))
            .assignee(Person::new("U2", "Dana"))
            .history(vec![StatusChange::status("To Do", "In Progress", None)])
            .build()
            .unwrap();
        let result = auditor.evaluate(&Subject::ticket("OPS-5", None), &[ticket]);

        let order: Vec<CriterionId> = result.criteria().keys().copied().collect();
        assert_eq!(order, CriterionId::ALL.to_vec());
    }

    #[test]
    fn test_batch_keeps_input_order() {
        let auditor = Auditor::new(AuditConfig::default());
        let subjects: Vec<SubjectTickets> = (0..16)
            .map(|i| {
                let key = format!("OPS-{i}");
                SubjectTickets {
                    subject: Subject::ticket(&key, None),
                    tickets: vec![TicketSnapshot::builder(key).build().unwrap()],
                }
            })
            .collect();
        let results = auditor.evaluate_batch(&subjects);
        let ids: Vec<String> = results.iter().map(AuditResult::subject_id).collect();
        let expected: Vec<String> = (0..16).map(|i| format!("OPS-{i}")).collect();
        assert_eq!(ids, expected);
    }
}
