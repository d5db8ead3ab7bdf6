//! The closed catalogue of compliance criteria.
//!
//! Declaration order of [`CriterionId`] is the evaluation order, the order of
//! criteria in every [`AuditResult`](crate::result::AuditResult), and the
//! tie-break order for recommendations. Automatable criteria come first.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which tier a criterion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Decided from structured fields alone.
    Automatable,
    /// Needs text heuristics or human judgment.
    Heuristic,
}

/// Which ticket class a criterion applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Applicability {
    /// Only MIT tickets.
    MitOnly,
    /// Only non-MIT tickets.
    NonMitOnly,
    /// Every ticket.
    Any,
}

/// Compliance criterion identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionId {
    /// 3 to 5 MIT tickets planned for the period.
    MitPlanning,
    /// MIT tickets created by the planning deadline.
    MitCreation,
    /// MIT tickets closed by the end of the period.
    MitCompletion,
    /// Enough non-MIT work tracked.
    NonMitTracking,
    /// Status transitions follow the workflow.
    StatusHygiene,
    /// Cancellations carry approval.
    TaskCancellation,
    /// Progress comments on the configured weekdays.
    WeeklyUpdates,
    /// Reporter and assignee set and distinct.
    RolesAndAccess,
    /// Description and traceability links present.
    DocumentationTraceability,
    /// Tickets pass through the in-progress state.
    LifecycleAdherence,
    /// Priority and issue type set.
    RequiredFields,
    /// Comments are substantive.
    CommentQuality,
    /// Tickets have comments at all.
    MissingComments,
    /// Screenshots come with an explanation.
    ScreenshotOnlyEvidence,
    /// Links come with an explanation.
    DocLinkOnlyEvidence,
    /// Descriptions are substantive.
    DescriptionQuality,
    /// Titles are specific.
    TitleQuality,
    /// One concern per ticket.
    MultipleIssuesInOneTicket,
    /// No bulk status rewrites.
    HistoryIntegrity,
    /// Acceptance criteria supplied.
    AcceptanceCriteriaRelevance,
    /// Cycle times are plausible.
    ProductivityValidity,
    /// Attached evidence matches the work.
    EvidenceRelevance,
}

impl CriterionId {
    /// Every criterion in evaluation order.
    pub const ALL: [Self; 22] = [
        Self::MitPlanning,
        Self::MitCreation,
        Self::MitCompletion,
        Self::NonMitTracking,
        Self::StatusHygiene,
        Self::TaskCancellation,
        Self::WeeklyUpdates,
        Self::RolesAndAccess,
        Self::DocumentationTraceability,
        Self::LifecycleAdherence,
        Self::RequiredFields,
        Self::CommentQuality,
        Self::MissingComments,
        Self::ScreenshotOnlyEvidence,
        Self::DocLinkOnlyEvidence,
        Self::DescriptionQuality,
        Self::TitleQuality,
        Self::MultipleIssuesInOneTicket,
        Self::HistoryIntegrity,
        Self::AcceptanceCriteriaRelevance,
        Self::ProductivityValidity,
        Self::EvidenceRelevance,
    ];

    /// Criteria of one tier, in evaluation order.
    pub fn in_tier(tier: Tier) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |c| c.tier() == tier)
    }

    /// Tier of this criterion.
    #[must_use]
    pub const fn tier(self) -> Tier {
        if (self as u8) < (Self::CommentQuality as u8) {
            Tier::Automatable
        } else {
            Tier::Heuristic
        }
    }

    /// Ticket class the criterion applies to.
    #[must_use]
    pub const fn applicability(self) -> Applicability {
        match self {
            Self::MitPlanning | Self::MitCreation | Self::MitCompletion => Applicability::MitOnly,
            Self::NonMitTracking => Applicability::NonMitOnly,
            _ => Applicability::Any,
        }
    }

    /// Returns `true` if a failure of this criterion is a zero-tolerance
    /// violation.
    #[must_use]
    pub const fn is_zero_tolerance(self) -> bool {
        matches!(self, Self::TaskCancellation | Self::HistoryIntegrity)
    }

    /// Stable snake-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MitPlanning => "mit_planning",
            Self::MitCreation => "mit_creation",
            Self::MitCompletion => "mit_completion",
            Self::NonMitTracking => "non_mit_tracking",
            Self::StatusHygiene => "status_hygiene",
            Self::TaskCancellation => "task_cancellation",
            Self::WeeklyUpdates => "weekly_updates",
            Self::RolesAndAccess => "roles_and_access",
            Self::DocumentationTraceability => "documentation_traceability",
            Self::LifecycleAdherence => "lifecycle_adherence",
            Self::RequiredFields => "required_fields",
            Self::CommentQuality => "comment_quality",
            Self::MissingComments => "missing_comments",
            Self::ScreenshotOnlyEvidence => "screenshot_only_evidence",
            Self::DocLinkOnlyEvidence => "doc_link_only_evidence",
            Self::DescriptionQuality => "description_quality",
            Self::TitleQuality => "title_quality",
            Self::MultipleIssuesInOneTicket => "multiple_issues_in_one_ticket",
            Self::HistoryIntegrity => "history_integrity",
            Self::AcceptanceCriteriaRelevance => "acceptance_criteria_relevance",
            Self::ProductivityValidity => "productivity_validity",
            Self::EvidenceRelevance => "evidence_relevance",
        }
    }

    /// Human label used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MitPlanning => "MIT Planning",
            Self::MitCreation => "MIT Creation",
            Self::MitCompletion => "MIT Completion",
            Self::NonMitTracking => "Non-MIT Tracking",
            Self::StatusHygiene => "Status Hygiene",
            Self::TaskCancellation => "Task Cancellation",
            Self::WeeklyUpdates => "Weekly Updates",
            Self::RolesAndAccess => "Role Ownership",
            Self::DocumentationTraceability => "Documentation & Traceability",
            Self::LifecycleAdherence => "Lifecycle Adherence",
            Self::RequiredFields => "Required Fields",
            Self::CommentQuality => "Comment Quality",
            Self::MissingComments => "Missing Comments",
            Self::ScreenshotOnlyEvidence => "Screenshot-Only Evidence",
            Self::DocLinkOnlyEvidence => "Doc-Link-Only Evidence",
            Self::DescriptionQuality => "Description Quality",
            Self::TitleQuality => "Title Quality",
            Self::MultipleIssuesInOneTicket => "Multiple Issues in One Ticket",
            Self::HistoryIntegrity => "History Integrity",
            Self::AcceptanceCriteriaRelevance => "Acceptance Criteria Relevance",
            Self::ProductivityValidity => "Productivity Validity",
            Self::EvidenceRelevance => "Evidence Relevance",
        }
    }

    /// Category label grouping related criteria in recommendations.
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::MitPlanning | Self::MitCreation | Self::MitCompletion | Self::NonMitTracking => {
                "Planning"
            },
            Self::StatusHygiene | Self::LifecycleAdherence | Self::HistoryIntegrity => "Workflow",
            Self::TaskCancellation => "Governance",
            Self::WeeklyUpdates | Self::CommentQuality | Self::MissingComments => "Communication",
            Self::RolesAndAccess | Self::RequiredFields => "Ownership",
            Self::DocumentationTraceability
            | Self::DescriptionQuality
            | Self::TitleQuality
            | Self::MultipleIssuesInOneTicket
            | Self::AcceptanceCriteriaRelevance => "Documentation",
            Self::ScreenshotOnlyEvidence | Self::DocLinkOnlyEvidence | Self::EvidenceRelevance => {
                "Evidence"
            },
            Self::ProductivityValidity => "Productivity",
        }
    }

    /// What a failure of this criterion looks like.
    #[must_use]
    pub const fn failure_description(self) -> &'static str {
        match self {
            Self::MitPlanning => "Fewer or more MIT tickets planned than the allowed range",
            Self::MitCreation => "MIT tickets created after the planning deadline",
            Self::MitCompletion => "MIT tickets left open at the end of the period",
            Self::NonMitTracking => "Too little non-MIT work tracked",
            Self::StatusHygiene => "Status transitions outside the configured workflow",
            Self::TaskCancellation => "Tickets cancelled without recorded approval",
            Self::WeeklyUpdates => "Progress updates missing on the required weekdays",
            Self::RolesAndAccess => "Reporter or assignee missing, or the same person",
            Self::DocumentationTraceability => "Descriptions incomplete or traceability links missing",
            Self::LifecycleAdherence => "Tickets closed without passing through In Progress",
            Self::RequiredFields => "Priority or issue type not set",
            Self::CommentQuality => "Comments too short or generic to convey progress",
            Self::MissingComments => "Tickets without any comments",
            Self::ScreenshotOnlyEvidence => "Screenshots attached without an explanation",
            Self::DocLinkOnlyEvidence => "Document links given without an explanation",
            Self::DescriptionQuality => "Descriptions too short or placeholder text",
            Self::TitleQuality => "Titles too short, too long or generic",
            Self::MultipleIssuesInOneTicket => "Several concerns tracked in a single ticket",
            Self::HistoryIntegrity => "Bulk status rewrites in the ticket history",
            Self::AcceptanceCriteriaRelevance => "Acceptance criteria missing or blank",
            Self::ProductivityValidity => "Implausible cycle times",
            Self::EvidenceRelevance => "Attached evidence does not match the work",
        }
    }

    /// Built-in suggested fix; configuration may override it.
    #[must_use]
    pub const fn default_fix(self) -> &'static str {
        match self {
            Self::MitPlanning => "Plan between 3 and 5 MIT tickets at the start of each week",
            Self::MitCreation => "Create MIT tickets on the first day of the week",
            Self::MitCompletion => "Close or re-plan MIT tickets before the week ends",
            Self::NonMitTracking => "Track ad-hoc and support work in its own tickets",
            Self::StatusHygiene => "Move tickets only along the documented workflow",
            Self::TaskCancellation => {
                "Record manager approval in a comment before cancelling a ticket"
            },
            Self::WeeklyUpdates => "Post a progress comment every Wednesday and Friday",
            Self::RolesAndAccess => "Set a reporter and a different assignee on every ticket",
            Self::DocumentationTraceability => {
                "Write a full description and link related tickets or artifacts"
            },
            Self::LifecycleAdherence => "Move tickets to In Progress when work starts",
            Self::RequiredFields => "Set priority and issue type when creating tickets",
            Self::CommentQuality => "Describe what changed, what is next and any blockers",
            Self::MissingComments => "Comment on tickets as work progresses",
            Self::ScreenshotOnlyEvidence => "Explain what each screenshot demonstrates",
            Self::DocLinkOnlyEvidence => "Summarize linked documents in the ticket",
            Self::DescriptionQuality => "Replace placeholder descriptions with the actual scope",
            Self::TitleQuality => "Use a specific, concise title naming the outcome",
            Self::MultipleIssuesInOneTicket => "Split unrelated concerns into separate tickets",
            Self::HistoryIntegrity => "Update statuses as work happens, not in bulk",
            Self::AcceptanceCriteriaRelevance => "Fill in acceptance criteria before starting work",
            Self::ProductivityValidity => "Keep tickets open for the time the work actually took",
            Self::EvidenceRelevance => "Attach evidence that demonstrates the ticket outcome",
        }
    }
}

impl fmt::Display for CriterionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
