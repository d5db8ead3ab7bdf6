//! MIT planning, creation and completion, and non-MIT tracking.

use chrono::Duration;

use super::{list_limited, CheckContext, MAX_LISTED};
use crate::criterion::CriterionId;
use crate::result::{CheckResult, Evidence};
use crate::subject::end_of_day;
use crate::ticket::TicketSnapshot;

pub(super) fn planning(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::MitPlanning;
    if !ctx.is_employee() {
        return CheckResult::not_applicable(id, "Planning is assessed per employee period");
    }
    let mit = &ctx.config.mit;
    let count = ctx.mit_tickets().count();
    if (mit.min_planned..=mit.max_planned).contains(&count) {
        CheckResult::pass(id, format!("{count} MIT tickets planned"))
    } else {
        CheckResult::fail(
            id,
            format!(
                "{count} MIT tickets planned, expected {}-{}",
                mit.min_planned, mit.max_planned
            ),
        )
    }
}

/// Every MIT ticket created by the end of `period.start + deadline days`.
pub(super) fn creation(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::MitCreation;
    let tickets: Vec<&TicketSnapshot> = ctx.mit_tickets().collect();
    if tickets.is_empty() {
        return CheckResult::not_applicable(id, "No MIT tickets");
    }
    let Some(period) = ctx.subject.period() else {
        return CheckResult::unknown(id, "No reporting period");
    };
    let days = ctx.config.mit.creation_deadline_days;
    let Some(deadline_day) = period.start().checked_add_signed(Duration::days(i64::from(days)))
    else {
        return CheckResult::unknown(id, format!("Creation deadline of {days} days out of range"));
    };
    let deadline = end_of_day(deadline_day, ctx.config.cadence.offset());

    let mut late = Vec::new();
    let mut undated = Vec::new();
    for ticket in tickets {
        match ticket.created() {
            Some(created) if created > deadline => late.push(ticket),
            Some(_) => {},
            None => undated.push(ticket.key()),
        }
    }

    if !late.is_empty() {
        let keys: Vec<&str> = late.iter().map(|t| t.key()).collect();
        let evidence = late.iter().take(MAX_LISTED).map(|t| {
            let created = t.created().map(|c| c.to_rfc3339()).unwrap_or_default();
            Evidence::new(t.key(), "created", &created)
        });
        return CheckResult::fail(
            id,
            format!("Created after {deadline_day}: {}", list_limited(&keys)),
        )
        .with_evidence_all(evidence);
    }
    if !undated.is_empty() {
        return CheckResult::unknown(
            id,
            format!("Creation time missing: {}", list_limited(&undated)),
        );
    }
    CheckResult::pass(id, format!("MIT tickets created by {deadline_day}"))
}

/// Every MIT ticket closed, and resolved by the period end when both are
/// known.
pub(super) fn completion(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::MitCompletion;
    let tickets: Vec<&TicketSnapshot> = ctx.mit_tickets().collect();
    if tickets.is_empty() {
        return CheckResult::not_applicable(id, "No MIT tickets");
    }
    let period_end = ctx
        .subject
        .period()
        .map(|p| p.end_instant(ctx.config.cadence.offset()));

    let open: Vec<&TicketSnapshot> = tickets
        .iter()
        .copied()
        .filter(|t| {
            let closed = ctx.config.mit.is_closed(t.status());
            let late = matches!((t.resolved(), period_end), (Some(r), Some(end)) if r > end);
            !closed || late
        })
        .collect();

    if open.is_empty() {
        return CheckResult::pass(id, format!("{} MIT tickets closed", tickets.len()));
    }
    let keys: Vec<&str> = open.iter().map(|t| t.key()).collect();
    CheckResult::fail(id, format!("Open MIT tickets: {}", list_limited(&keys))).with_evidence_all(
        open.iter()
            .take(MAX_LISTED)
            .map(|t| Evidence::new(t.key(), "status", t.status())),
    )
}

pub(super) fn non_mit_tracking(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::NonMitTracking;
    if !ctx.is_employee() {
        return CheckResult::not_applicable(id, "Tracking is assessed per employee period");
    }
    let required = ctx.config.mit.min_non_mit_active;
    let active = ctx
        .non_mit_tickets()
        .filter(|t| !ctx.graph.is_terminal(t.status()) && !ctx.config.mit.is_closed(t.status()))
        .count();
    if active >= required {
        CheckResult::pass(id, format!("{active} active non-MIT tickets"))
    } else {
        CheckResult::fail(
            id,
            format!("{active} active non-MIT tickets, expected at least {required}"),
        )
    }
}
