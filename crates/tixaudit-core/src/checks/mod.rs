//! Compliance checks.
//!
//! Every criterion maps to one pure function from a [`CheckContext`] to a
//! [`CheckResult`]. [`run`] dispatches on the closed [`CriterionId`] set;
//! adding a criterion without a check is a compile error.
//!
//! Checks never perform I/O and never fail: missing input resolves to
//! `Unknown` or `NeedsManualReview`, and an empty ticket set resolves to
//! `NotApplicable`.

mod cadence;
mod cancellation;
mod heuristic;
mod mit;
mod ownership;
mod status;

pub use status::StatusGraph;

use crate::classify::Classifier;
use crate::config::AuditConfig;
use crate::criterion::CriterionId;
use crate::result::{CheckResult, Evidence, Severity, Verdict};
use crate::subject::Subject;
use crate::ticket::TicketSnapshot;

/// Maximum number of failing items named in a reason or evidence list.
pub const MAX_LISTED: usize = 3;

/// Everything a check may read.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// Engine configuration.
    pub config: &'a AuditConfig,
    /// Subject under audit.
    pub subject: &'a Subject,
    /// Tickets in scope for the subject.
    pub tickets: &'a [TicketSnapshot],
    /// Workflow graph built from the configuration.
    pub graph: &'a StatusGraph,
    /// MIT classifier built from the configuration.
    pub classifier: &'a Classifier,
}

impl<'a> CheckContext<'a> {
    /// MIT tickets in scope.
    pub fn mit_tickets(&self) -> impl Iterator<Item = &'a TicketSnapshot> + 'a {
        let classifier = self.classifier;
        self.tickets.iter().filter(move |t| classifier.is_mit(t))
    }

    /// Non-MIT tickets in scope.
    pub fn non_mit_tickets(&self) -> impl Iterator<Item = &'a TicketSnapshot> + 'a {
        let classifier = self.classifier;
        self.tickets.iter().filter(move |t| !classifier.is_mit(t))
    }

    /// Returns `true` for employee subjects.
    #[must_use]
    pub const fn is_employee(&self) -> bool {
        matches!(self.subject, Subject::Employee { .. })
    }
}

/// Evaluates one criterion.
#[must_use]
pub fn run(criterion: CriterionId, ctx: &CheckContext<'_>) -> CheckResult {
    if ctx.tickets.is_empty() {
        return CheckResult::not_applicable(criterion, "No tickets in scope");
    }
    match criterion {
        CriterionId::MitPlanning => mit::planning(ctx),
        CriterionId::MitCreation => mit::creation(ctx),
        CriterionId::MitCompletion => mit::completion(ctx),
        CriterionId::NonMitTracking => mit::non_mit_tracking(ctx),
        CriterionId::StatusHygiene => status::hygiene(ctx),
        CriterionId::TaskCancellation => cancellation::check(ctx),
        CriterionId::WeeklyUpdates => cadence::check(ctx),
        CriterionId::RolesAndAccess => ownership::roles(ctx),
        CriterionId::DocumentationTraceability => ownership::documentation(ctx),
        CriterionId::LifecycleAdherence => status::lifecycle(ctx),
        CriterionId::RequiredFields => ownership::required_fields(ctx),
        CriterionId::CommentQuality => heuristic::comment_quality(ctx),
        CriterionId::MissingComments => heuristic::missing_comments(ctx),
        CriterionId::ScreenshotOnlyEvidence => heuristic::screenshot_only(ctx),
        CriterionId::DocLinkOnlyEvidence => heuristic::doc_link_only(ctx),
        CriterionId::DescriptionQuality => heuristic::description_quality(ctx),
        CriterionId::TitleQuality => heuristic::title_quality(ctx),
        CriterionId::MultipleIssuesInOneTicket => heuristic::multiple_issues(ctx),
        CriterionId::HistoryIntegrity => heuristic::history_integrity(ctx),
        CriterionId::AcceptanceCriteriaRelevance => heuristic::acceptance_criteria(ctx),
        CriterionId::ProductivityValidity => heuristic::productivity(ctx),
        CriterionId::EvidenceRelevance => heuristic::evidence_relevance(ctx),
    }
}

/// Combines per-ticket results of one criterion.
///
/// Fail beats Unknown, which beats `NeedsManualReview`, which beats Pass,
/// which beats `NotApplicable`. The first result of the winning verdict
/// supplies reason and severity. A failure carries the evidence of up to
/// [`MAX_LISTED`] failing tickets. Gaps of every result are kept.
pub(crate) fn combine(criterion: CriterionId, results: Vec<CheckResult>) -> CheckResult {
    const PRECEDENCE: [Verdict; 5] = [
        Verdict::Fail,
        Verdict::Unknown,
        Verdict::NeedsManualReview,
        Verdict::Pass,
        Verdict::NotApplicable,
    ];

    let gaps: Vec<String> = results.iter().flat_map(|r| r.gaps().to_vec()).collect();
    let Some(verdict) = PRECEDENCE
        .into_iter()
        .find(|v| results.iter().any(|r| r.verdict() == *v))
    else {
        return CheckResult::not_applicable(criterion, "No tickets in scope");
    };

    let mut winners = results.into_iter().filter(|r| r.verdict() == verdict);
    let Some(first) = winners.next() else {
        return CheckResult::not_applicable(criterion, "No tickets in scope");
    };
    let mut combined = rebuild(criterion, &first).with_gaps(gaps);
    if verdict == Verdict::Fail {
        let evidence: Vec<Evidence> = std::iter::once(first)
            .chain(winners)
            .take(MAX_LISTED)
            .flat_map(|r| r.evidence().to_vec())
            .collect();
        combined = combined.with_evidence_all(evidence);
    }
    combined
}

fn rebuild(criterion: CriterionId, from: &CheckResult) -> CheckResult {
    let reason = from.reason();
    match (from.verdict(), from.severity()) {
        (Verdict::Fail, Severity::Critical) => CheckResult::critical_fail(criterion, reason),
        (Verdict::Fail, _) => CheckResult::fail(criterion, reason),
        (Verdict::Unknown, Severity::CriticalUnknown) => {
            CheckResult::critical_unknown(criterion, reason)
        },
        (Verdict::Unknown, _) => CheckResult::unknown(criterion, reason),
        (Verdict::NeedsManualReview, _) => CheckResult::manual_review(criterion, reason),
        (Verdict::Pass, _) => CheckResult::pass(criterion, reason),
        (Verdict::NotApplicable, _) => CheckResult::not_applicable(criterion, reason),
    }
}

/// Joins up to [`MAX_LISTED`] items, noting how many were left out.
pub(crate) fn list_limited<S: AsRef<str>>(items: &[S]) -> String {
    let shown: Vec<&str> = items.iter().take(MAX_LISTED).map(AsRef::as_ref).collect();
    let mut out = shown.join(", ");
    if items.len() > MAX_LISTED {
        out.push_str(&format!(" (+{} more)", items.len() - MAX_LISTED));
    }
    out
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::subject::AuditPeriod;

    /// Owns everything a [`CheckContext`] borrows.
    pub struct Fixture {
        pub config: AuditConfig,
        pub subject: Subject,
        pub tickets: Vec<TicketSnapshot>,
        pub graph: StatusGraph,
        pub classifier: Classifier,
    }

    impl Fixture {
        pub fn ticket(ticket: TicketSnapshot) -> Self {
            let subject = Subject::ticket(ticket.key(), None);
            Self::with_subject(subject, vec![ticket])
        }

        pub fn employee(account_id: &str, period: AuditPeriod, tickets: Vec<TicketSnapshot>) -> Self {
            let subject = Subject::Employee {
                account_id: account_id.to_string(),
                display_name: account_id.to_string(),
                period,
            };
            Self::with_subject(subject, tickets)
        }

        pub fn with_subject(subject: Subject, tickets: Vec<TicketSnapshot>) -> Self {
            let config = AuditConfig::default();
            let graph = StatusGraph::from_config(&config.workflow);
            let classifier = Classifier::new(config.mit.strategy.clone());
            Self {
                config,
                subject,
                tickets,
                graph,
                classifier,
            }
        }

        pub fn ctx(&self) -> CheckContext<'_> {
            CheckContext {
                config: &self.config,
                subject: &self.subject,
                tickets: &self.tickets,
                graph: &self.graph,
                classifier: &self.classifier,
            }
        }
    }
}
