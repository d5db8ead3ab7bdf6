//! Workflow checks: status hygiene and lifecycle adherence.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::{list_limited, CheckContext, MAX_LISTED};
use crate::config::WorkflowConfig;
use crate::criterion::CriterionId;
use crate::result::{CheckResult, Evidence};
use crate::text;

/// Legal status transitions, matched case-insensitively.
///
/// A status with an empty successor set is terminal. Statuses absent from
/// the map are unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusGraph {
    transitions: BTreeMap<String, BTreeSet<String>>,
}

impl StatusGraph {
    /// Builds the graph from the workflow configuration.
    #[must_use]
    pub fn from_config(workflow: &WorkflowConfig) -> Self {
        let transitions = workflow
            .transitions
            .iter()
            .map(|(from, to)| {
                (
                    text::normalize(from),
                    to.iter().map(|s| text::normalize(s)).collect(),
                )
            })
            .collect();
        Self { transitions }
    }

    /// Returns `true` if `status` appears in the map.
    #[must_use]
    pub fn is_known(&self, status: &str) -> bool {
        self.transitions.contains_key(&text::normalize(status))
    }

    /// Returns `true` if `status` is known and has no successors.
    #[must_use]
    pub fn is_terminal(&self, status: &str) -> bool {
        self.transitions
            .get(&text::normalize(status))
            .is_some_and(BTreeSet::is_empty)
    }

    /// Returns `Some(legal)` for a known from-state, `None` for an unknown
    /// one.
    #[must_use]
    pub fn allows(&self, from: &str, to: &str) -> Option<bool> {
        self.transitions
            .get(&text::normalize(from))
            .map(|next| next.contains(&text::normalize(to)))
    }
}

/// Every recorded transition must be legal in the workflow.
pub(super) fn hygiene(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::StatusHygiene;
    if ctx.tickets.iter().all(|t| t.history().is_none()) {
        return CheckResult::unknown(id, "No changelog supplied");
    }

    let mut invalid = Vec::new();
    let mut evidence = Vec::new();
    let mut gaps = Vec::new();
    let mut checked = 0usize;
    for ticket in ctx.tickets {
        for change in ticket.status_changes() {
            let (Some(from), Some(to)) = (change.from.as_deref(), change.to.as_deref()) else {
                continue;
            };
            checked += 1;
            match ctx.graph.allows(from, to) {
                Some(true) => {},
                Some(false) => {
                    if evidence.len() < MAX_LISTED {
                        evidence.push(Evidence::new(
                            ticket.key(),
                            "status",
                            &format!("{from} -> {to}"),
                        ));
                    }
                    invalid.push(format!("{}: {from} -> {to}", ticket.key()));
                },
                None => {
                    warn!(
                        ticket = %ticket.key(),
                        status = %from,
                        "Transition from a status not in the workflow map"
                    );
                    gaps.push(format!("{}: unknown status '{from}'", ticket.key()));
                },
            }
        }
    }

    if invalid.is_empty() {
        CheckResult::pass(id, format!("{checked} transitions follow the workflow")).with_gaps(gaps)
    } else {
        CheckResult::fail(id, format!("Invalid transitions: {}", list_limited(&invalid)))
            .with_evidence_all(evidence)
            .with_gaps(gaps)
    }
}

/// Tickets that reached the done state must have passed through the
/// in-progress state.
pub(super) fn lifecycle(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::LifecycleAdherence;
    let workflow = &ctx.config.workflow;

    let mut skipped = Vec::new();
    let mut evidence = Vec::new();
    let mut unknown = Vec::new();
    for ticket in ctx.tickets {
        let mut visited: BTreeSet<String> = ticket
            .status_changes()
            .flat_map(|c| [c.from.as_deref(), c.to.as_deref()])
            .flatten()
            .map(text::normalize)
            .collect();
        visited.insert(text::normalize(ticket.status()));

        if !visited.contains(&text::normalize(&workflow.done_status)) {
            continue;
        }
        if ticket.history().is_none() {
            unknown.push(ticket.key().to_string());
            continue;
        }
        if !visited.contains(&text::normalize(&workflow.in_progress_status)) {
            if evidence.len() < MAX_LISTED {
                evidence.push(Evidence::new(ticket.key(), "status", ticket.status()));
            }
            skipped.push(format!(
                "{}: Skipped {}",
                ticket.key(),
                workflow.in_progress_status
            ));
        }
    }

    if !skipped.is_empty() {
        CheckResult::fail(id, list_limited(&skipped)).with_evidence_all(evidence)
    } else if !unknown.is_empty() {
        CheckResult::unknown(
            id,
            format!("No changelog for completed tickets: {}", list_limited(&unknown)),
        )
    } else {
        CheckResult::pass(id, "Completed tickets passed through the in-progress state")
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::Fixture;
    use super::*;
    use crate::result::Verdict;
    use crate::ticket::{StatusChange, TicketSnapshot};

    fn walked(key: &str, path: &[&str]) -> TicketSnapshot {
        let history = path
            .windows(2)
            .map(|pair| StatusChange::status(pair[0], pair[1], None))
            .collect();
        TicketSnapshot::builder(key)
            .status(*path.last().unwrap())
            .history(history)
            .build()
            .unwrap()
    }

    #[test]
    fn test_graph_matching_ignores_case() {
        let graph = StatusGraph::from_config(&WorkflowConfig::default());
        assert_eq!(graph.allows("to do", "IN PROGRESS"), Some(true));
        assert_eq!(graph.allows("To Do", "Done"), Some(false));
        assert_eq!(graph.allows("Triage", "Done"), None);
        assert!(graph.is_terminal("done"));
        assert!(!graph.is_terminal("In Progress"));
        assert!(!graph.is_terminal("Triage"));
    }

    #[test]
    fn test_hygiene_pass_on_legal_walk() {
        let fixture = Fixture::ticket(walked("OPS-1", &["To Do", "In Progress", "Done"]));
        let result = hygiene(&fixture.ctx());
        assert_eq!(result.verdict(), Verdict::Pass);
        assert!(result.gaps().is_empty());
    }

    #[test]
    fn test_hygiene_fail_lists_transitions() {
        let fixture = Fixture::ticket(walked("OPS-1", &["To Do", "Done"]));
        let result = hygiene(&fixture.ctx());
        assert_eq!(result.verdict(), Verdict::Fail);
        assert!(result.reason().contains("OPS-1: To Do -> Done"));
        assert_eq!(result.evidence()[0].value_snippet, "To Do -> Done");
    }

    #[test]
    fn test_hygiene_unknown_from_state_is_gap() {
        let fixture = Fixture::ticket(walked("OPS-1", &["Triage", "To Do", "In Progress"]));
        let result = hygiene(&fixture.ctx());
        assert_eq!(result.verdict(), Verdict::Pass);
        assert_eq!(result.gaps(), ["OPS-1: unknown status 'Triage'"]);
    }

    #[test]
    fn test_hygiene_without_changelog_is_unknown() {
        let ticket = TicketSnapshot::builder("OPS-1").status("Done").build().unwrap();
        let fixture = Fixture::ticket(ticket);
        assert_eq!(hygiene(&fixture.ctx()).verdict(), Verdict::Unknown);
    }

    #[test]
    fn test_hygiene_is_idempotent() {
        let fixture = Fixture::with_subject(
            crate::subject::Subject::ticket("set", None),
            vec![
                walked("OPS-1", &["To Do", "Done"]),
                walked("OPS-2", &["To Do", "In Progress", "Done"]),
            ],
        );
        assert_eq!(hygiene(&fixture.ctx()), hygiene(&fixture.ctx()));
    }

    #[test]
    fn test_lifecycle_skipped_in_progress() {
        let fixture = Fixture::ticket(walked("OPS-2", &["To Do", "Done"]));
        let result = lifecycle(&fixture.ctx());
        assert_eq!(result.verdict(), Verdict::Fail);
        assert!(result.reason().contains("Skipped In Progress"));
    }

    #[test]
    fn test_lifecycle_pass_and_open_tickets() {
        let fixture = Fixture::ticket(walked("OPS-1", &["To Do", "In Progress", "Done"]));
        assert_eq!(lifecycle(&fixture.ctx()).verdict(), Verdict::Pass);

        let fixture = Fixture::ticket(walked("OPS-3", &["To Do"]));
        assert_eq!(lifecycle(&fixture.ctx()).verdict(), Verdict::Pass);
    }

    #[test]
    fn test_lifecycle_done_without_changelog_is_unknown() {
        let ticket = TicketSnapshot::builder("OPS-4").status("Done").build().unwrap();
        let fixture = Fixture::ticket(ticket);
        assert_eq!(lifecycle(&fixture.ctx()).verdict(), Verdict::Unknown);
    }
}
