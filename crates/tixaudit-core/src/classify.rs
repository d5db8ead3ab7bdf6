//! MIT vs non-MIT ticket classification.
//!
//! Exactly one [`MitStrategy`] is active per configuration. Classification
//! is total: a ticket without the configured signal is [`TicketClass::NonMit`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::text;
use crate::ticket::TicketSnapshot;

/// How MIT tickets are recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MitStrategy {
    /// The ticket carries a label (case-insensitive).
    Label {
        /// Label name.
        label: String,
    },
    /// A custom field is set to true.
    CustomField {
        /// Custom field id or name.
        field_id: String,
    },
    /// The issue type matches (case-insensitive).
    IssueType {
        /// Issue type name.
        name: String,
    },
    /// The summary contains a token (case-insensitive).
    SummaryToken {
        /// Token searched for.
        token: String,
    },
}

impl Default for MitStrategy {
    fn default() -> Self {
        Self::Label {
            label: "MIT".to_string(),
        }
    }
}

/// Ticket class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketClass {
    /// Most important task.
    Mit,
    /// Any other ticket.
    NonMit,
}

/// Classifies tickets with one strategy.
#[derive(Debug, Clone)]
pub struct Classifier {
    strategy: MitStrategy,
}

impl Classifier {
    /// Creates a classifier.
    #[must_use]
    pub const fn new(strategy: MitStrategy) -> Self {
        Self { strategy }
    }

    /// Active strategy.
    #[must_use]
    pub const fn strategy(&self) -> &MitStrategy {
        &self.strategy
    }

    /// Classifies one ticket.
    #[must_use]
    pub fn classify(&self, ticket: &TicketSnapshot) -> TicketClass {
        let is_mit = match &self.strategy {
            MitStrategy::Label { label } => ticket.has_label(label),
            MitStrategy::CustomField { field_id } => {
                ticket.custom_field(field_id).is_some_and(is_truthy)
            },
            MitStrategy::IssueType { name } => ticket
                .issue_type()
                .is_some_and(|issue_type| text::same_name(issue_type, name)),
            MitStrategy::SummaryToken { token } => {
                !token.trim().is_empty()
                    && text::normalize(ticket.summary()).contains(&text::normalize(token))
            },
        };
        if is_mit {
            TicketClass::Mit
        } else {
            TicketClass::NonMit
        }
    }

    /// Returns `true` if the ticket is a MIT.
    #[must_use]
    pub fn is_mit(&self, ticket: &TicketSnapshot) -> bool {
        self.classify(ticket) == TicketClass::Mit
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(s) => matches!(text::normalize(s).as_str(), "true" | "yes"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ticket() -> crate::ticket::TicketSnapshotBuilder {
        TicketSnapshot::builder("OPS-1")
    }

    #[test]
    fn test_label_strategy_ignores_case() {
        let classifier = Classifier::new(MitStrategy::default());
        assert!(classifier.is_mit(&ticket().label("mit").build().unwrap()));
        assert_eq!(
            classifier.classify(&ticket().label("ops").build().unwrap()),
            TicketClass::NonMit
        );
    }

    #[test]
    fn test_custom_field_strategy() {
        let classifier = Classifier::new(MitStrategy::CustomField {
            field_id: "customfield_10042".to_string(),
        });
        let yes = ticket()
            .custom_field("customfield_10042", json!(true))
            .build()
            .unwrap();
        let text_yes = ticket()
            .custom_field("customfield_10042", json!("Yes"))
            .build()
            .unwrap();
        let no = ticket()
            .custom_field("customfield_10042", json!(false))
            .build()
            .unwrap();
        let missing = ticket().build().unwrap();

        assert!(classifier.is_mit(&yes));
        assert!(classifier.is_mit(&text_yes));
        assert!(!classifier.is_mit(&no));
        assert!(!classifier.is_mit(&missing));
    }

    #[test]
    fn test_issue_type_and_summary_token() {
        let by_type = Classifier::new(MitStrategy::IssueType {
            name: "Priority Task".to_string(),
        });
        assert!(by_type.is_mit(&ticket().issue_type("priority task").build().unwrap()));
        assert!(!by_type.is_mit(&ticket().build().unwrap()));

        let by_token = Classifier::new(MitStrategy::SummaryToken {
            token: "[MIT]".to_string(),
        });
        assert!(by_token.is_mit(&ticket().summary("[mit] Ship exporter").build().unwrap()));
        assert!(!by_token.is_mit(&ticket().summary("Ship exporter").build().unwrap()));
    }

    #[test]
    fn test_strategy_toml_shape() {
        let strategy: MitStrategy = toml::from_str(
            r#"
            method = "custom_field"
            field_id = "customfield_1"
            "#,
        )
        .unwrap();
        assert_eq!(
            strategy,
            MitStrategy::CustomField {
                field_id: "customfield_1".to_string()
            }
        );
    }
}
