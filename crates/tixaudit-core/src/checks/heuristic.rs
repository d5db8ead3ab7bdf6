//! Heuristic checks.
//!
//! These decide from free text, attachments and timing. Where the signal is
//! not supplied they resolve to `Unknown`; where only a person can judge
//! relevance they resolve to `NeedsManualReview`. Per-ticket outcomes are
//! merged with [`combine`].

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde_json::Value;

use super::{combine, list_limited, CheckContext};
use crate::criterion::CriterionId;
use crate::result::{CheckResult, Evidence};
use crate::text;
use crate::ticket::{Description, TicketSnapshot};

static ITEM_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:and|&|\+|/)\s+|;").expect("item separator regex is valid")
});

fn per_ticket(
    ctx: &CheckContext<'_>,
    criterion: CriterionId,
    f: impl Fn(&TicketSnapshot) -> CheckResult,
) -> CheckResult {
    combine(criterion, ctx.tickets.iter().map(f).collect())
}

pub(super) fn comment_quality(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::CommentQuality;
    let rules = &ctx.config.heuristics;
    per_ticket(ctx, id, |ticket| {
        let key = ticket.key();
        let Some(comments) = ticket.comments() else {
            return CheckResult::unknown(id, format!("{key}: comments not supplied"));
        };
        if comments.is_empty() {
            return CheckResult::not_applicable(id, format!("{key}: no comments"));
        }
        let weak = comments.iter().find(|c| {
            text::word_count(&c.body) < rules.min_comment_words
                || text::is_generic(&c.body, &rules.generic_terms)
        });
        match weak {
            Some(comment) => CheckResult::fail(id, format!("{key}: Comment too short or generic"))
                .with_evidence(Evidence::new(key, "comments", &comment.body)),
            None => CheckResult::pass(id, format!("{key}: comments are substantive")),
        }
    })
}

pub(super) fn missing_comments(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::MissingComments;
    per_ticket(ctx, id, |ticket| {
        let key = ticket.key();
        match ticket.comments() {
            None => CheckResult::unknown(id, format!("{key}: comments not supplied")),
            Some([]) => CheckResult::fail(id, format!("{key}: No comments"))
                .with_evidence(Evidence::new(key, "comments", "")),
            Some(_) => CheckResult::pass(id, format!("{key}: commented")),
        }
    })
}

/// Words of explanation around attachments and links: non-URL description
/// words plus every comment word.
fn explanation_words(ticket: &TicketSnapshot) -> usize {
    let description = text::word_count(&text::strip_urls(&ticket.description_text()));
    let comments: usize = ticket
        .comments()
        .unwrap_or_default()
        .iter()
        .map(|c| text::word_count(&text::strip_urls(&c.body)))
        .sum();
    description + comments
}

pub(super) fn screenshot_only(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::ScreenshotOnlyEvidence;
    let min_words = ctx.config.heuristics.min_explanation_words;
    per_ticket(ctx, id, |ticket| {
        let key = ticket.key();
        let Some(image) = ticket.attachments().iter().find(|a| a.is_image()) else {
            return CheckResult::not_applicable(id, format!("{key}: no screenshots"));
        };
        if explanation_words(ticket) < min_words {
            CheckResult::fail(id, format!("{key}: Screenshots without explanation"))
                .with_evidence(Evidence::new(key, "attachments", &image.filename))
        } else {
            CheckResult::pass(id, format!("{key}: screenshots explained"))
        }
    })
}

pub(super) fn doc_link_only(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::DocLinkOnlyEvidence;
    let min_words = ctx.config.heuristics.min_explanation_words;
    per_ticket(ctx, id, |ticket| {
        let key = ticket.key();
        let description = ticket.description_text();
        let Some(url) = text::urls(&description).next() else {
            return CheckResult::not_applicable(id, format!("{key}: no document links"));
        };
        let described = text::word_count(&text::strip_urls(&description)) >= min_words;
        let commented = ticket
            .comments()
            .unwrap_or_default()
            .iter()
            .any(|c| text::word_count(&text::strip_urls(&c.body)) >= min_words);
        if described || commented {
            CheckResult::pass(id, format!("{key}: links explained"))
        } else {
            CheckResult::fail(id, format!("{key}: Document links without explanation"))
                .with_evidence(Evidence::new(key, "description", url))
        }
    })
}

pub(super) fn description_quality(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::DescriptionQuality;
    let min_length = ctx.config.documentation.min_description_length;
    let generic = &ctx.config.heuristics.generic_terms;
    per_ticket(ctx, id, |ticket| {
        let key = ticket.key();
        if ticket.description().is_none() {
            return CheckResult::unknown(id, format!("{key}: description not supplied"));
        }
        let description = ticket.description_text();
        if description.trim().chars().count() < min_length || text::is_generic(&description, generic) {
            CheckResult::fail(id, format!("{key}: Description too short or placeholder"))
                .with_evidence(Evidence::new(key, "description", &description))
        } else {
            CheckResult::pass(id, format!("{key}: description is substantive"))
        }
    })
}

pub(super) fn title_quality(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::TitleQuality;
    let rules = &ctx.config.heuristics;
    per_ticket(ctx, id, |ticket| {
        let key = ticket.key();
        let title = ticket.summary().trim();
        let length = title.chars().count();
        if length < rules.min_title_length || length > rules.max_title_length {
            CheckResult::fail(
                id,
                format!(
                    "{key}: Title length {length} outside {}-{}",
                    rules.min_title_length, rules.max_title_length
                ),
            )
            .with_evidence(Evidence::new(key, "summary", title))
        } else if text::is_generic(title, &rules.generic_terms) {
            CheckResult::fail(id, format!("{key}: Title is generic"))
                .with_evidence(Evidence::new(key, "summary", title))
        } else {
            CheckResult::pass(id, format!("{key}: title is specific"))
        }
    })
}

pub(super) fn multiple_issues(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::MultipleIssuesInOneTicket;
    let threshold = ctx.config.heuristics.multiple_issue_items;
    per_ticket(ctx, id, |ticket| {
        let key = ticket.key();
        let parts = ITEM_SEPARATOR
            .split(ticket.summary())
            .filter(|p| !p.trim().is_empty())
            .count();
        let items = text::list_item_count(&ticket.description_text());
        if parts >= 2 {
            CheckResult::manual_review(id, format!("{key}: title joins {parts} items"))
                .with_evidence(Evidence::new(key, "summary", ticket.summary()))
        } else if items >= threshold {
            CheckResult::manual_review(id, format!("{key}: description lists {items} items"))
        } else {
            CheckResult::pass(id, format!("{key}: single concern"))
        }
    })
}

/// Flags bulk rewrites: too many status changes across the set inside one
/// window. Thresholds below 2 count as 2.
pub(super) fn history_integrity(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::HistoryIntegrity;
    if ctx.tickets.iter().all(|t| t.history().is_none()) {
        return CheckResult::unknown(id, "No changelog supplied");
    }
    let rules = &ctx.config.heuristics;
    let window = Duration::minutes(i64::from(rules.burst_window_minutes));

    let mut changes: Vec<(DateTime<Utc>, &str)> = ctx
        .tickets
        .iter()
        .flat_map(|t| t.status_changes().filter_map(move |c| c.changed_at.map(|at| (at, t.key()))))
        .collect();
    changes.sort_by_key(|(at, _)| *at);

    let burst = changes
        .windows(rules.burst_threshold.max(2))
        .find(|w| w[w.len() - 1].0 - w[0].0 <= window);
    if let Some(burst) = burst {
        let mut keys: Vec<&str> = burst.iter().map(|(_, key)| *key).collect();
        keys.dedup();
        return CheckResult::critical_fail(
            id,
            format!(
                "{} status changes within {} minutes starting {}: {}",
                burst.len(),
                rules.burst_window_minutes,
                burst[0].0.to_rfc3339(),
                list_limited(&keys)
            ),
        )
        .with_evidence_all(
            keys.iter()
                .take(super::MAX_LISTED)
                .map(|key| Evidence::new(*key, "history", "status changes in burst")),
        );
    }
    CheckResult::pass(id, format!("{} status changes, no bulk rewrites", changes.len()))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(_) | Value::Object(_) => {
            Description::Document(value.clone()).plain_text().trim().is_empty()
        },
        Value::Bool(_) | Value::Number(_) => false,
    }
}

pub(super) fn acceptance_criteria(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::AcceptanceCriteriaRelevance;
    let fields = &ctx.config.heuristics.acceptance_criteria_fields;
    per_ticket(ctx, id, |ticket| {
        let key = ticket.key();
        let Some((field, value)) = fields
            .iter()
            .find_map(|f| ticket.custom_field(f).map(|v| (f, v)))
        else {
            return CheckResult::unknown(id, format!("{key}: acceptance criteria not supplied"));
        };
        if is_blank(value) {
            CheckResult::fail(id, format!("{key}: Acceptance criteria blank"))
                .with_evidence(Evidence::new(key, field.as_str(), ""))
        } else {
            CheckResult::manual_review(id, format!("{key}: acceptance criteria need review"))
        }
    })
}

pub(super) fn productivity(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::ProductivityValidity;
    let workflow = &ctx.config.workflow;
    let min_cycle = Duration::minutes(i64::from(ctx.config.heuristics.min_cycle_minutes));
    per_ticket(ctx, id, |ticket| {
        let key = ticket.key();
        let finished =
            ticket.status_is(&workflow.done_status) || ctx.config.mit.is_closed(ticket.status());
        match (ticket.created(), ticket.resolved()) {
            (None, _) => CheckResult::unknown(id, format!("{key}: creation time missing")),
            (Some(_), None) if finished => {
                CheckResult::unknown(id, format!("{key}: resolution time missing"))
            },
            (Some(_), None) => CheckResult::not_applicable(id, format!("{key}: not resolved")),
            (Some(created), Some(resolved)) => {
                let cycle = resolved - created;
                if cycle < min_cycle {
                    CheckResult::manual_review(
                        id,
                        format!("{key}: resolved {} minutes after creation", cycle.num_minutes()),
                    )
                    .with_evidence(Evidence::new(key, "resolved", &resolved.to_rfc3339()))
                } else {
                    CheckResult::pass(id, format!("{key}: plausible cycle time"))
                }
            },
        }
    })
}

pub(super) fn evidence_relevance(ctx: &CheckContext<'_>) -> CheckResult {
    let id = CriterionId::EvidenceRelevance;
    per_ticket(ctx, id, |ticket| {
        let key = ticket.key();
        let attached = ticket.attachments().len();
        let linked = ticket.links().len();
        if attached + linked == 0 {
            CheckResult::not_applicable(id, format!("{key}: no attached evidence"))
        } else {
            CheckResult::manual_review(
                id,
                format!("{key}: {attached} attachments and {linked} links to review"),
            )
        }
    })
}
