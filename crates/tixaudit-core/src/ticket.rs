//! Immutable ticket snapshots.
//!
//! A [`TicketSnapshot`] is a point-in-time materialization of a tracked work
//! item: its fields, comments and status-change history. Snapshots are
//! produced by the ticket-fetch collaborator (by deserialization or through
//! [`TicketSnapshotBuilder`]) and are never mutated afterwards; every check
//! reads them through shared references.
//!
//! # Missing vs empty
//!
//! Evidence collections distinguish "not supplied" from "supplied and
//! empty":
//!
//! - `comments: None` means the upstream did not deliver comments;
//!   `Some(vec![])` means the ticket has no comments.
//! - `history: None` means the changelog was not delivered.
//!
//! Checks resolve "not supplied" as `Unknown` rather than guessing.
//!
//! # Example
//!
//! ```rust
//! use tixaudit_core::ticket::{Person, StatusChange, TicketSnapshot};
//!
//! let ticket = TicketSnapshot::builder("OPS-7")
//!     .summary("Rotate ingest credentials")
//!     .status("Done")
//!     .assignee(Person::new("U2", "Dana"))
//!     .reporter(Person::new("U1", "Lee"))
//!     .history(vec![StatusChange::status("To Do", "In Progress", None)])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(ticket.key(), "OPS-7");
//! assert_eq!(ticket.status_changes().count(), 1);
//! assert!(ticket.comments().is_none());
//! ```

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::text;

/// File extensions treated as images when no MIME type is supplied.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "heic"];

// ============================================================================
// SnapshotError
// ============================================================================

/// Errors raised while building a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    /// The ticket key was empty.
    #[error("ticket key must not be empty")]
    EmptyKey,
}

// ============================================================================
// Value types
// ============================================================================

/// An account referenced by a ticket (assignee, reporter, creator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Person {
    /// Stable account identifier.
    pub account_id: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: String,
    /// Email address, when the tracker exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Person {
    /// Creates a person without an email address.
    #[must_use]
    pub fn new(account_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            display_name: display_name.into(),
            email: None,
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Returns `true` if the account id is non-blank.
    #[must_use]
    pub fn is_identified(&self) -> bool {
        !self.account_id.trim().is_empty()
    }
}

/// A file attached to a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Attachment {
    /// File name as uploaded.
    pub filename: String,
    /// MIME type reported by the tracker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Attachment {
    /// Creates an attachment record.
    #[must_use]
    pub fn new(filename: impl Into<String>, mime_type: Option<&str>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.map(str::to_string),
        }
    }

    /// Returns `true` if the attachment is an image (screenshot).
    ///
    /// The MIME type wins when present; otherwise the file extension is
    /// consulted.
    #[must_use]
    pub fn is_image(&self) -> bool {
        if let Some(mime) = &self.mime_type {
            return mime.trim().to_ascii_lowercase().starts_with("image/");
        }
        self.filename
            .rsplit_once('.')
            .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    }
}

/// A comment on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Comment {
    /// Account id of the author, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    /// Comment body as plain text.
    #[serde(default)]
    pub body: String,
    /// Creation timestamp.
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,
}

impl Comment {
    /// Creates a comment.
    #[must_use]
    pub fn new(
        author_id: impl Into<String>,
        body: impl Into<String>,
        created: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            author_id: Some(author_id.into()),
            body: body.into(),
            created,
        }
    }

    /// Returns `true` if the comment was written by `account_id`.
    #[must_use]
    pub fn is_authored_by(&self, account_id: &str) -> bool {
        self.author_id.as_deref() == Some(account_id)
    }
}

/// One entry of a ticket's change history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusChange {
    /// Name of the changed field (`status` for transitions).
    pub field: String,
    /// Previous value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// New value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// When the change happened.
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub changed_at: Option<DateTime<Utc>>,
    /// Account id of whoever made the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl StatusChange {
    /// Creates a `status` field change.
    #[must_use]
    pub fn status(
        from: impl Into<String>,
        to: impl Into<String>,
        changed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            field: "status".to_string(),
            from: Some(from.into()),
            to: Some(to.into()),
            changed_at,
            actor: None,
        }
    }

    /// Sets the actor.
    #[must_use]
    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Returns `true` if this entry records a status transition.
    #[must_use]
    pub fn is_status(&self) -> bool {
        self.field.trim().eq_ignore_ascii_case("status")
    }

    /// All textual content of the entry, lowercased, for keyword scans.
    pub(crate) fn searchable_text(&self) -> String {
        [
            Some(self.field.as_str()),
            self.from.as_deref(),
            self.to.as_deref(),
            self.actor.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }
}

/// A ticket description: free text or a structured document.
///
/// Structured documents (rich-text trees as emitted by tracker APIs) are
/// flattened by collecting every `text` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Description {
    /// Plain or wiki-markup text.
    Text(String),
    /// Structured document tree.
    Document(Value),
}

impl Description {
    /// Returns the description as plain text.
    #[must_use]
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Document(doc) => {
                let mut parts = Vec::new();
                collect_text_nodes(doc, &mut parts);
                parts.join(" ")
            },
        }
    }
}

fn collect_text_nodes<'a>(node: &'a Value, out: &mut Vec<&'a str>) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                out.push(text);
            }
            for (key, child) in map {
                if key != "text" {
                    collect_text_nodes(child, out);
                }
            }
        },
        Value::Array(items) => {
            for item in items {
                collect_text_nodes(item, out);
            }
        },
        _ => {},
    }
}

// ============================================================================
// TicketSnapshot
// ============================================================================

/// Immutable snapshot of one ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketSnapshot {
    key: String,
    #[serde(default)]
    summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<Description>,
    #[serde(default)]
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    issue_type: Option<String>,
    #[serde(default)]
    labels: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    assignee: Option<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reporter: Option<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    creator: Option<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    due_date: Option<NaiveDate>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    created: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    updated: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    resolved: Option<DateTime<Utc>>,
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(default)]
    links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comments: Option<Vec<Comment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    history: Option<Vec<StatusChange>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    custom_fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fetch_error: Option<String>,
}

impl TicketSnapshot {
    /// Starts building a snapshot for `key`.
    #[must_use]
    pub fn builder(key: impl Into<String>) -> TicketSnapshotBuilder {
        TicketSnapshotBuilder::new(key)
    }

    /// Creates the upstream sentinel for a ticket whose data could not be
    /// fetched.
    #[must_use]
    pub fn fetch_failed(key: impl Into<String>, error: impl Into<String>) -> Self {
        let mut snapshot = Self::empty(key.into());
        snapshot.fetch_error = Some(error.into());
        snapshot
    }

    const fn empty(key: String) -> Self {
        Self {
            key,
            summary: String::new(),
            description: None,
            status: String::new(),
            priority: None,
            issue_type: None,
            labels: BTreeSet::new(),
            assignee: None,
            reporter: None,
            creator: None,
            due_date: None,
            created: None,
            updated: None,
            resolved: None,
            attachments: Vec::new(),
            links: Vec::new(),
            comments: None,
            history: None,
            custom_fields: BTreeMap::new(),
            fetch_error: None,
        }
    }

    /// Stable ticket key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// One-line summary (title).
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Description, if supplied.
    #[must_use]
    pub const fn description(&self) -> Option<&Description> {
        self.description.as_ref()
    }

    /// Description flattened to plain text; empty when not supplied.
    #[must_use]
    pub fn description_text(&self) -> String {
        self.description
            .as_ref()
            .map(Description::plain_text)
            .unwrap_or_default()
    }

    /// Current status name.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Returns `true` if the current status equals `name`
    /// (case-insensitive).
    #[must_use]
    pub fn status_is(&self, name: &str) -> bool {
        text::same_name(&self.status, name)
    }

    /// Priority name.
    #[must_use]
    pub fn priority(&self) -> Option<&str> {
        self.priority.as_deref()
    }

    /// Issue type name.
    #[must_use]
    pub fn issue_type(&self) -> Option<&str> {
        self.issue_type.as_deref()
    }

    /// Labels.
    #[must_use]
    pub const fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// Returns `true` if the ticket carries `label` (case-insensitive).
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| text::same_name(l, label))
    }

    /// Assignee.
    #[must_use]
    pub const fn assignee(&self) -> Option<&Person> {
        self.assignee.as_ref()
    }

    /// Reporter.
    #[must_use]
    pub const fn reporter(&self) -> Option<&Person> {
        self.reporter.as_ref()
    }

    /// Creator.
    #[must_use]
    pub const fn creator(&self) -> Option<&Person> {
        self.creator.as_ref()
    }

    /// Due date.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    /// Last-update timestamp.
    #[must_use]
    pub const fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    /// Resolution timestamp.
    #[must_use]
    pub const fn resolved(&self) -> Option<DateTime<Utc>> {
        self.resolved
    }

    /// Attachments.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Related ticket ids.
    #[must_use]
    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Comments; `None` when the upstream did not supply them.
    #[must_use]
    pub fn comments(&self) -> Option<&[Comment]> {
        self.comments.as_deref()
    }

    /// Change history; `None` when the changelog was not supplied.
    #[must_use]
    pub fn history(&self) -> Option<&[StatusChange]> {
        self.history.as_deref()
    }

    /// Status transitions from the history, in recorded order.
    pub fn status_changes(&self) -> impl Iterator<Item = &StatusChange> {
        self.history
            .iter()
            .flatten()
            .filter(|change| change.is_status())
    }

    /// Custom field value by id or name.
    #[must_use]
    pub fn custom_field(&self, field: &str) -> Option<&Value> {
        self.custom_fields.get(field)
    }

    /// All custom fields.
    #[must_use]
    pub const fn custom_fields(&self) -> &BTreeMap<String, Value> {
        &self.custom_fields
    }

    /// Upstream fetch error, if the ticket could not be obtained.
    #[must_use]
    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    /// Returns `true` if the snapshot carries at least one comment or one
    /// history entry.
    #[must_use]
    pub fn has_activity_evidence(&self) -> bool {
        self.comments.as_ref().is_some_and(|c| !c.is_empty())
            || self.history.as_ref().is_some_and(|h| !h.is_empty())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`TicketSnapshot`].
#[derive(Debug, Clone)]
#[must_use]
pub struct TicketSnapshotBuilder {
    inner: TicketSnapshot,
}

impl TicketSnapshotBuilder {
    fn new(key: impl Into<String>) -> Self {
        Self {
            inner: TicketSnapshot::empty(key.into()),
        }
    }

    /// Sets the summary.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.inner.summary = summary.into();
        self
    }

    /// Sets a plain-text description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.inner.description = Some(Description::Text(description.into()));
        self
    }

    /// Sets a structured-document description.
    pub fn description_document(mut self, document: Value) -> Self {
        self.inner.description = Some(Description::Document(document));
        self
    }

    /// Sets the current status.
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.inner.status = status.into();
        self
    }

    /// Sets the priority.
    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.inner.priority = Some(priority.into());
        self
    }

    /// Sets the issue type.
    pub fn issue_type(mut self, issue_type: impl Into<String>) -> Self {
        self.inner.issue_type = Some(issue_type.into());
        self
    }

    /// Adds a label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.inner.labels.insert(label.into());
        self
    }

    /// Sets the assignee.
    pub fn assignee(mut self, person: Person) -> Self {
        self.inner.assignee = Some(person);
        self
    }

    /// Sets the reporter.
    pub fn reporter(mut self, person: Person) -> Self {
        self.inner.reporter = Some(person);
        self
    }

    /// Sets the creator.
    pub fn creator(mut self, person: Person) -> Self {
        self.inner.creator = Some(person);
        self
    }

    /// Sets the due date.
    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.inner.due_date = Some(date);
        self
    }

    /// Sets the creation timestamp.
    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.inner.created = Some(at);
        self
    }

    /// Sets the last-update timestamp.
    pub fn updated(mut self, at: DateTime<Utc>) -> Self {
        self.inner.updated = Some(at);
        self
    }

    /// Sets the resolution timestamp.
    pub fn resolved(mut self, at: DateTime<Utc>) -> Self {
        self.inner.resolved = Some(at);
        self
    }

    /// Adds an attachment.
    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.inner.attachments.push(attachment);
        self
    }

    /// Adds a related ticket id.
    pub fn link(mut self, key: impl Into<String>) -> Self {
        self.inner.links.push(key.into());
        self
    }

    /// Supplies the full comment list (possibly empty).
    pub fn comments(mut self, comments: Vec<Comment>) -> Self {
        self.inner.comments = Some(comments);
        self
    }

    /// Appends one comment, marking comments as supplied.
    pub fn comment(mut self, comment: Comment) -> Self {
        self.inner.comments.get_or_insert_with(Vec::new).push(comment);
        self
    }

    /// Supplies the full change history (possibly empty).
    pub fn history(mut self, history: Vec<StatusChange>) -> Self {
        self.inner.history = Some(history);
        self
    }

    /// Appends one history entry, marking history as supplied.
    pub fn change(mut self, change: StatusChange) -> Self {
        self.inner.history.get_or_insert_with(Vec::new).push(change);
        self
    }

    /// Sets a custom field.
    pub fn custom_field(mut self, field: impl Into<String>, value: Value) -> Self {
        self.inner.custom_fields.insert(field.into(), value);
        self
    }

    /// Finishes the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::EmptyKey`] if the key is blank.
    pub fn build(self) -> Result<TicketSnapshot, SnapshotError> {
        if self.inner.key.trim().is_empty() {
            return Err(SnapshotError::EmptyKey);
        }
        Ok(self.inner)
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Timestamp parsing for tracker payloads.
///
/// Accepts RFC 3339 (`2026-01-20T10:00:00Z`), the tracker form with a
/// colon-less offset (`2026-01-20T10:00:00.000+0000`), and a bare local
/// timestamp, which is read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};

    /// Parses a timestamp in any accepted form.
    #[must_use]
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Serde adapter for `Option<DateTime<Utc>>` fields.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serializes as RFC 3339.
        ///
        /// # Errors
        ///
        /// Propagates serializer errors.
        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(at) => serializer.serialize_some(&at.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        /// Deserializes any accepted form; blank strings read as `None`.
        ///
        /// # Errors
        ///
        /// Fails on strings that are not timestamps.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            match raw {
                None => Ok(None),
                Some(s) if s.trim().is_empty() => Ok(None),
                Some(s) => super::parse(&s)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {s}"))),
            }
        }
    }
}
