//! Ownership and documentation checks.

use super::{list_limited, CheckContext, MAX_LISTED};
use crate::criterion::CriterionId;
use crate::result::{CheckResult, Evidence};
use crate::ticket::{Person, TicketSnapshot};

/// Reporter and assignee set and distinct. The first violating ticket
/// decides the reason.
pub(super) fn roles(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::RolesAndAccess;
    for ticket in ctx.tickets {
        if let Some((reason, field, value)) = role_violation(ticket) {
            return CheckResult::fail(id, reason)
                .with_evidence(Evidence::new(ticket.key(), field, &value));
        }
    }
    CheckResult::pass(id, "Reporter and assignee set and distinct")
}

fn role_violation(ticket: &TicketSnapshot) -> Option<(&'static str, &'static str, String)> {
    let identified = |p: Option<&Person>| p.filter(|p| p.is_identified()).cloned();
    let Some(reporter) = identified(ticket.reporter()) else {
        return Some(("Reporter missing", "reporter", String::new()));
    };
    let Some(assignee) = identified(ticket.assignee()) else {
        return Some(("Assignee missing", "assignee", String::new()));
    };
    if reporter.account_id == assignee.account_id {
        return Some(("Reporter = Assignee", "assignee", assignee.account_id));
    }
    None
}

/// Description long enough and at least one link or attachment per ticket.
/// A missing due date is a gap unless due dates are required.
pub(super) fn documentation(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::DocumentationTraceability;
    let rules = &ctx.config.documentation;

    let mut gaps = Vec::new();
    let mut no_due_date = Vec::new();
    let mut hard: Option<(&'static str, Evidence)> = None;
    for ticket in ctx.tickets {
        if ticket.due_date().is_none() {
            gaps.push(format!("{}: Due date missing", ticket.key()));
            no_due_date.push(ticket.key().to_string());
        }
        if hard.is_some() {
            continue;
        }
        let description = ticket.description_text();
        if description.trim().chars().count() < rules.min_description_length {
            hard = Some((
                "Description incomplete",
                Evidence::new(ticket.key(), "description", &description),
            ));
        } else if ticket.links().is_empty() && ticket.attachments().is_empty() {
            hard = Some((
                "No traceability links",
                Evidence::new(ticket.key(), "links", ""),
            ));
        }
    }

    if let Some((reason, evidence)) = hard {
        return CheckResult::fail(id, reason)
            .with_evidence(evidence)
            .with_gaps(gaps);
    }
    if rules.due_date_required && !no_due_date.is_empty() {
        let evidence = no_due_date
            .iter()
            .take(MAX_LISTED)
            .map(|key| Evidence::new(key.as_str(), "due_date", ""));
        return CheckResult::fail(id, "Due date missing")
            .with_evidence_all(evidence)
            .with_gaps(gaps);
    }
    CheckResult::pass(id, "Descriptions complete and traceable").with_gaps(gaps)
}

/// Priority and issue type set on every ticket.
pub(super) fn required_fields(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::RequiredFields;
    let mut missing = Vec::new();
    let mut evidence = Vec::new();
    for ticket in ctx.tickets {
        let absent: Vec<&str> = [
            ("priority", ticket.priority()),
            ("issue type", ticket.issue_type()),
        ]
        .into_iter()
        .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect();
        if absent.is_empty() {
            continue;
        }
        if evidence.len() < MAX_LISTED {
            evidence.push(Evidence::new(ticket.key(), absent[0], ""));
        }
        missing.push(format!("{}: {} missing", ticket.key(), absent.join(", ")));
    }
    if missing.is_empty() {
        CheckResult::pass(id, "Priority and issue type set")
    } else {
        CheckResult::fail(id, list_limited(&missing)).with_evidence_all(evidence)
    }
}
