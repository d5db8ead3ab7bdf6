//! Task cancellation approval (zero tolerance).
//!
//! A cancelled ticket passes when approval is recorded. Strong approval is a
//! comment naming an authority and an approval, posted within the configured
//! window around the cancellation. Weak approval is an approval keyword in
//! any comment or history entry. Negated keywords ("not approved") do not
//! count. A cancelled ticket with activity but no
//! approval is a critical failure; one with no activity at all is a critical
//! unknown.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::{list_limited, CheckContext};
use crate::config::CancellationConfig;
use crate::criterion::CriterionId;
use crate::result::{CheckResult, Evidence};
use crate::text;
use crate::ticket::TicketSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Approval {
    Strong,
    Weak,
    Missing,
    NoEvidence,
}

pub(super) fn check(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::TaskCancellation;
    let cancelled_status = &ctx.config.workflow.cancelled_status;
    let rules = &ctx.config.cancellation;

    let mut strong = 0usize;
    let mut weak = 0usize;
    let mut missing = Vec::new();
    let mut no_evidence = Vec::new();
    for ticket in ctx.tickets.iter().filter(|t| t.status_is(cancelled_status)) {
        let approval = classify(ticket, cancelled_status, rules);
        debug!(ticket = %ticket.key(), ?approval, "Cancellation approval");
        match approval {
            Approval::Strong => strong += 1,
            Approval::Weak => weak += 1,
            Approval::Missing => missing.push(ticket),
            Approval::NoEvidence => no_evidence.push(ticket),
        }
    }

    if !missing.is_empty() {
        let keys: Vec<&str> = missing.iter().map(|t| t.key()).collect();
        return CheckResult::critical_fail(
            id,
            format!("Cancelled without approval: {}", list_limited(&keys)),
        )
        .with_evidence_all(evidence(&missing));
    }
    if !no_evidence.is_empty() {
        let keys: Vec<&str> = no_evidence.iter().map(|t| t.key()).collect();
        return CheckResult::critical_unknown(
            id,
            format!(
                "No approval or activity evidence for cancelled tickets: {}",
                list_limited(&keys)
            ),
        )
        .with_evidence_all(evidence(&no_evidence));
    }
    if strong + weak == 0 {
        return CheckResult::not_applicable(id, "No cancelled tickets");
    }
    CheckResult::pass(
        id,
        format!("{strong} cancellations approved by an authority, {weak} by keyword"),
    )
}

fn classify(ticket: &TicketSnapshot, cancelled_status: &str, rules: &CancellationConfig) -> Approval {
    if !ticket.has_activity_evidence() {
        return Approval::NoEvidence;
    }
    let comments = ticket.comments().unwrap_or_default();

    if let Some(at) = cancelled_at(ticket, cancelled_status) {
        let window = Duration::hours(i64::from(rules.window_hours));
        let strong = comments.iter().any(|c| {
            c.created.is_some_and(|created| (created - at).abs() <= window)
                && text::contains_any(&c.body, &rules.authority_tokens)
                && text::affirms_any(&c.body, &rules.approval_tokens)
        });
        if strong {
            return Approval::Strong;
        }
    }

    let weak = comments
        .iter()
        .any(|c| text::affirms_any(&c.body, &rules.approval_tokens))
        || ticket
            .history()
            .unwrap_or_default()
            .iter()
            .any(|h| text::affirms_any(&h.searchable_text(), &rules.approval_tokens));
    if weak {
        Approval::Weak
    } else {
        Approval::Missing
    }
}

/// When the ticket was cancelled: the last history entry moving to the
/// cancellation status, else the resolution time, else the last update.
fn cancelled_at(ticket: &TicketSnapshot, cancelled_status: &str) -> Option<DateTime<Utc>> {
    ticket
        .status_changes()
        .filter(|c| c.to.as_deref().is_some_and(|to| text::same_name(to, cancelled_status)))
        .filter_map(|c| c.changed_at)
        .last()
        .or_else(|| ticket.resolved())
        .or_else(|| ticket.updated())
}

fn evidence(tickets: &[&TicketSnapshot]) -> Vec<Evidence> {
    tickets
        .iter()
        .take(super::MAX_LISTED)
        .map(|t| Evidence::new(t.key(), "status", t.status()))
        .collect()
}
