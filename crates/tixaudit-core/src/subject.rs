//! Audit subjects and reporting periods.
//!
//! A [`Subject`] is the unit being audited: one employee over a reporting
//! period, or one ticket in isolation. [`employee_weeks`] and [`per_ticket`]
//! partition a snapshot set into subjects the way a reporting run does.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ticket::{Person, TicketSnapshot};

/// Errors raised when constructing a period.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PeriodError {
    /// The period ends before it starts.
    #[error("period end {end} is before start {start}")]
    Reversed {
        /// Requested first day.
        start: NaiveDate,
        /// Requested last day.
        end: NaiveDate,
    },
}

// ============================================================================
// AuditPeriod
// ============================================================================

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl AuditPeriod {
    /// Creates a period covering `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::Reversed`] if `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
        if end < start {
            return Err(PeriodError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    /// The Monday-to-Sunday week containing `date`.
    #[must_use]
    pub fn week_of(date: NaiveDate) -> Self {
        let start = date
            .checked_sub_signed(Duration::days(i64::from(date.weekday().num_days_from_monday())))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start,
            end: start.checked_add_signed(Duration::days(6)).unwrap_or(NaiveDate::MAX),
        }
    }

    /// All Monday-started weeks overlapping `start..=end`, in order.
    #[must_use]
    pub fn iso_weeks(start: NaiveDate, end: NaiveDate) -> Vec<Self> {
        let mut weeks = Vec::new();
        let mut current = Self::week_of(start);
        let step = Duration::days(7);
        while current.start <= end {
            weeks.push(current);
            let (Some(start), Some(end)) = (
                current.start.checked_add_signed(step),
                current.end.checked_add_signed(step),
            ) else {
                break;
            };
            current = Self { start, end };
        }
        weeks
    }

    /// First day.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns `true` if `at`, seen in `offset`, falls on a day of the
    /// period.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>, offset: FixedOffset) -> bool {
        let day = at.with_timezone(&offset).date_naive();
        self.start <= day && day <= self.end
    }

    /// The last instant of the period in `offset`.
    #[must_use]
    pub fn end_instant(&self, offset: FixedOffset) -> DateTime<Utc> {
        end_of_day(self.end, offset)
    }
}

/// The last instant of `day` in `offset`.
#[must_use]
pub fn end_of_day(day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    offset
        .from_local_datetime(&day.and_time(last))
        .single()
        .map_or_else(|| day.and_time(last).and_utc(), |local| local.with_timezone(&Utc))
}

// ============================================================================
// Subject
// ============================================================================

/// Whether a subject is an employee period or a single ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// One employee over a period.
    Employee,
    /// One ticket in isolation.
    Ticket,
}

/// The unit being audited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subject {
    /// One employee over a reporting period.
    Employee {
        /// Account id of the employee.
        account_id: String,
        /// Display name of the employee.
        display_name: String,
        /// Reporting period.
        period: AuditPeriod,
    },
    /// One ticket, optionally bounded by a reporting period.
    Ticket {
        /// Ticket key.
        key: String,
        /// Reporting period, when the audit is time-boxed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<AuditPeriod>,
    },
}

impl Subject {
    /// Creates an employee subject.
    #[must_use]
    pub fn employee(person: &Person, period: AuditPeriod) -> Self {
        Self::Employee {
            account_id: person.account_id.clone(),
            display_name: person.display_name.clone(),
            period,
        }
    }

    /// Creates a ticket subject.
    #[must_use]
    pub fn ticket(key: impl Into<String>, period: Option<AuditPeriod>) -> Self {
        Self::Ticket {
            key: key.into(),
            period,
        }
    }

    /// Stable identifier used in reports: the ticket key, or
    /// `account@week-start` for employees.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Self::Employee {
                account_id, period, ..
            } => format!("{account_id}@{}", period.start()),
            Self::Ticket { key, .. } => key.clone(),
        }
    }

    /// Subject kind.
    #[must_use]
    pub const fn kind(&self) -> SubjectKind {
        match self {
            Self::Employee { .. } => SubjectKind::Employee,
            Self::Ticket { .. } => SubjectKind::Ticket,
        }
    }

    /// Reporting period, if any.
    #[must_use]
    pub const fn period(&self) -> Option<&AuditPeriod> {
        match self {
            Self::Employee { period, .. } => Some(period),
            Self::Ticket { period, .. } => period.as_ref(),
        }
    }

    /// Employee account id, for employee subjects.
    #[must_use]
    pub fn account_id(&self) -> Option<&str> {
        match self {
            Self::Employee { account_id, .. } => Some(account_id),
            Self::Ticket { .. } => None,
        }
    }
}

/// A subject together with the tickets it is audited on.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectTickets {
    /// The subject.
    pub subject: Subject,
    /// Tickets in the subject's scope, in input order.
    pub tickets: Vec<TicketSnapshot>,
}

// ============================================================================
// Partitioning
// ============================================================================

/// One subject per ticket.
#[must_use]
pub fn per_ticket(tickets: &[TicketSnapshot], period: Option<AuditPeriod>) -> Vec<SubjectTickets> {
    tickets
        .iter()
        .map(|ticket| SubjectTickets {
            subject: Subject::ticket(ticket.key(), period),
            tickets: vec![ticket.clone()],
        })
        .collect()
}

/// Employee-week subjects covering `start..=end`.
///
/// Employees are every assignee and reporter seen in `tickets`, ordered by
/// display name then account id. A ticket belongs to an employee-week when
/// the employee is its assignee or reporter and the ticket was updated
/// (falling back to created) during the week. Upstream fetch failures are
/// kept in every subject for the week so the failure surfaces in the
/// result. Employee-weeks without activity are skipped.
///
/// A fetch failure naming no identified assignee or reporter cannot be
/// placed in an employee-week; it becomes a ticket subject of its own,
/// appended after the employee-weeks, over the whole range.
#[must_use]
pub fn employee_weeks(
    tickets: &[TicketSnapshot],
    start: NaiveDate,
    end: NaiveDate,
    offset: FixedOffset,
) -> Vec<SubjectTickets> {
    let mut people: BTreeMap<String, Person> = BTreeMap::new();
    for ticket in tickets {
        for person in [ticket.assignee(), ticket.reporter()].into_iter().flatten() {
            if person.is_identified() {
                people
                    .entry(person.account_id.clone())
                    .or_insert_with(|| person.clone());
            }
        }
    }
    let mut people: Vec<Person> = people.into_values().collect();
    people.sort_by(|a, b| {
        a.display_name
            .cmp(&b.display_name)
            .then_with(|| a.account_id.cmp(&b.account_id))
    });

    let weeks = AuditPeriod::iso_weeks(start, end);
    let mut out = Vec::new();
    for person in &people {
        for week in &weeks {
            let scoped: Vec<TicketSnapshot> = tickets
                .iter()
                .filter(|ticket| involves(ticket, &person.account_id))
                .filter(|ticket| {
                    ticket.fetch_error().is_some()
                        || ticket
                            .updated()
                            .or_else(|| ticket.created())
                            .is_some_and(|at| week.contains(at, offset))
                })
                .cloned()
                .collect();
            if scoped.is_empty() {
                debug!(
                    account_id = %person.account_id,
                    week_start = %week.start(),
                    "No activity for employee-week, skipping"
                );
                continue;
            }
            out.push(SubjectTickets {
                subject: Subject::employee(person, *week),
                tickets: scoped,
            });
        }
    }

    let range = AuditPeriod::new(start, end).ok();
    for ticket in tickets {
        let owned = [ticket.assignee(), ticket.reporter()]
            .into_iter()
            .flatten()
            .any(Person::is_identified);
        if ticket.fetch_error().is_some() && !owned {
            debug!(ticket = %ticket.key(), "Unowned fetch failure kept as a ticket subject");
            out.push(SubjectTickets {
                subject: Subject::ticket(ticket.key(), range),
                tickets: vec![ticket.clone()],
            });
        }
    }
    out
}

fn involves(ticket: &TicketSnapshot, account_id: &str) -> bool {
    [ticket.assignee(), ticket.reporter()]
        .into_iter()
        .flatten()
        .any(|p| p.account_id == account_id)
}
