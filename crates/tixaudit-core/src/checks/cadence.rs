//! Weekly update cadence.

use std::collections::BTreeSet;

use chrono::{Datelike, Weekday};

use super::CheckContext;
use crate::criterion::CriterionId;
use crate::result::{CheckResult, Evidence};
use crate::subject::Subject;

/// The subject must have commented on every configured weekday.
///
/// The author is the employee, or the assignee of the ticket for ticket
/// subjects. Days are computed in the configured reporting offset.
pub(super) fn check(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::WeeklyUpdates;
    let cadence = &ctx.config.cadence;
    let offset = cadence.offset();

    if ctx.tickets.iter().all(|t| t.comments().is_none()) {
        return CheckResult::unknown(id, "No comments supplied");
    }
    let Some(author) = author(ctx) else {
        return CheckResult::unknown(id, "Author identity unknown");
    };

    let mut covered: BTreeSet<u32> = BTreeSet::new();
    let mut evidence = Vec::new();
    for ticket in ctx.tickets {
        for comment in ticket.comments().unwrap_or_default() {
            let Some(created) = comment.created else {
                continue;
            };
            if !comment.is_authored_by(&author) {
                continue;
            }
            if ctx
                .subject
                .period()
                .is_some_and(|p| !p.contains(created, offset))
            {
                continue;
            }
            let weekday = created.with_timezone(&offset).weekday();
            if cadence.days.contains(&weekday) && covered.insert(weekday.num_days_from_monday()) {
                evidence.push(Evidence::new(ticket.key(), "comments", &comment.body));
            }
        }
    }

    let (hit, missed): (Vec<Weekday>, Vec<Weekday>) = cadence
        .days
        .iter()
        .copied()
        .partition(|d| covered.contains(&d.num_days_from_monday()));
    if missed.is_empty() {
        CheckResult::pass(id, format!("Updates posted on {}", days(&hit))).with_evidence_all(evidence)
    } else if hit.is_empty() {
        CheckResult::fail(id, format!("No updates on {}", days(&missed)))
    } else {
        CheckResult::fail(
            id,
            format!(
                "Partial - updates on {}, missing {}",
                days(&hit),
                days(&missed)
            ),
        )
        .with_evidence_all(evidence)
    }
}

fn author(ctx: &CheckContext<'_>) -> Option<String> {
    match ctx.subject {
        Subject::Employee { account_id, .. } => Some(account_id.clone()),
        Subject::Ticket { .. } => ctx
            .tickets
            .first()
            .and_then(|t| t.assignee())
            .filter(|p| p.is_identified())
            .map(|p| p.account_id.clone()),
    }
}

fn days(days: &[Weekday]) -> String {
    days.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
