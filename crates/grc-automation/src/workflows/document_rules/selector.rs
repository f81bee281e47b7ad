use std::cmp::Ordering;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::conditions::RuleCondition;
use super::domain::{Document, WorkflowRule};
use crate::tenant::AppCode;

/// Whether evaluation stops at the first matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    FirstMatch,
    AllMatches,
}

/// Total order over rules in one scope: priority desc, execution order asc, id asc.
pub fn rule_ordering(left: &WorkflowRule, right: &WorkflowRule) -> Ordering {
    right
        .priority
        .cmp(&left.priority)
        .then_with(|| left.execution_order.cmp(&right.execution_order))
        .then_with(|| left.id.cmp(&right.id))
}

pub fn order_rules(rules: &mut [WorkflowRule]) {
    rules.sort_by(rule_ordering);
}

/// Enabled rules scoped to `app_code` (or unscoped), in evaluation order.
pub fn applicable_rules<I>(rules: I, app_code: Option<&AppCode>) -> Vec<WorkflowRule>
where
    I: IntoIterator<Item = WorkflowRule>,
{
    let mut applicable: Vec<WorkflowRule> = rules
        .into_iter()
        .filter(|rule| rule.is_enabled && rule.applies_to(app_code))
        .collect();
    order_rules(&mut applicable);
    applicable
}

/// Evaluates conditions as of the current UTC date.
pub fn evaluate(conditions: &RuleCondition, document: &Document) -> bool {
    conditions.evaluate(document, Utc::now().date_naive())
}

/// Matching rules from an already ordered slice.
pub fn select_matching<'a>(
    ordered: &'a [WorkflowRule],
    document: &Document,
    today: NaiveDate,
    mode: MatchMode,
) -> Vec<&'a WorkflowRule> {
    let mut matching = ordered
        .iter()
        .filter(|rule| rule.conditions.evaluate(document, today));

    match mode {
        MatchMode::FirstMatch => matching.next().into_iter().collect(),
        MatchMode::AllMatches => matching.collect(),
    }
}
