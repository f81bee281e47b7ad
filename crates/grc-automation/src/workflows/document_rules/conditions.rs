use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{Document, DocumentStatus};

/// Typed predicate tree evaluated against a document.
///
/// Leaf predicates on a missing field evaluate to `false`; evaluation never fails.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    #[default]
    Always,
    FieldEquals {
        field: String,
        value: Value,
    },
    FieldInRange {
        field: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    FieldIn {
        field: String,
        values: Vec<Value>,
    },
    FieldExists {
        field: String,
    },
    HasTag {
        tag: String,
    },
    StatusIs {
        status: DocumentStatus,
    },
    ExpiresWithin {
        days: i64,
    },
    All {
        conditions: Vec<RuleCondition>,
    },
    Any {
        conditions: Vec<RuleCondition>,
    },
    Not {
        condition: Box<RuleCondition>,
    },
}

impl RuleCondition {
    pub fn evaluate(&self, document: &Document, today: NaiveDate) -> bool {
        match self {
            RuleCondition::Always => true,
            RuleCondition::FieldEquals { field, value } => document
                .field(field)
                .is_some_and(|actual| values_match(&actual, value)),
            RuleCondition::FieldInRange { field, min, max } => document
                .field(field)
                .and_then(|actual| actual.as_f64())
                .is_some_and(|number| {
                    min.map_or(true, |min| number >= min) && max.map_or(true, |max| number <= max)
                }),
            RuleCondition::FieldIn { field, values } => document
                .field(field)
                .is_some_and(|actual| values.iter().any(|candidate| values_match(&actual, candidate))),
            RuleCondition::FieldExists { field } => document
                .field(field)
                .is_some_and(|actual| !actual.is_null()),
            RuleCondition::HasTag { tag } => document.tags.contains(tag),
            RuleCondition::StatusIs { status } => document.status == *status,
            RuleCondition::ExpiresWithin { days } => document
                .days_until_expiry(today)
                .is_some_and(|remaining| (0..=*days).contains(&remaining)),
            RuleCondition::All { conditions } => conditions
                .iter()
                .all(|condition| condition.evaluate(document, today)),
            RuleCondition::Any { conditions } => conditions
                .iter()
                .any(|condition| condition.evaluate(document, today)),
            RuleCondition::Not { condition } => !condition.evaluate(document, today),
        }
    }
}

/// JSON equality that treats `1` and `1.0` as the same number.
fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(left), Some(right)) => (left - right).abs() < f64::EPSILON,
        _ => actual == expected,
    }
}
