use std::collections::BTreeSet;
use std::time::Instant;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use super::actions::{apply_actions, expiry_message, DocumentAlert, RuleAction};
use super::domain::{
    Document, DocumentId, ExecutionStatus, RuleType, TriggerEvent, WorkflowExecution,
    WorkflowRule,
};
use super::selector::MatchMode;

/// Outcome of running one rule: the log row plus the (possibly updated) document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleRun {
    pub execution: WorkflowExecution,
    pub document: Document,
    pub alerts: Vec<DocumentAlert>,
}

/// Upcoming or past expiry reported by `check_expirations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationNotice {
    pub document_id: DocumentId,
    pub title: String,
    pub expires_on: NaiveDate,
    pub days_until_expiry: i64,
    pub expired: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub previous: Option<Value>,
    pub current: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionComparison {
    pub document_id: DocumentId,
    pub previous_version: u32,
    pub current_version: u32,
    pub version_advanced: bool,
    pub tags_added: Vec<String>,
    pub tags_removed: Vec<String>,
    pub changes: Vec<FieldChange>,
}

/// Stateless interpreter that applies rules to documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowEngine;

impl WorkflowEngine {
    pub fn new() -> Self {
        Self
    }

    /// Executes a single rule. Disabled rules and unmet conditions are recorded as skipped;
    /// an action failure is recorded as failed and leaves the document unchanged.
    pub fn execute(
        &self,
        rule: &WorkflowRule,
        document: &Document,
        trigger_event: Option<TriggerEvent>,
        now: DateTime<Utc>,
    ) -> RuleRun {
        let clock = Instant::now();
        let today = now.date_naive();
        let mut execution = WorkflowExecution::start(rule, document, trigger_event, now);

        let (status, updated, alerts) = if !rule.is_enabled {
            execution.error_details = Some(json!({ "reason": "rule_disabled" }));
            (ExecutionStatus::Skipped, document.clone(), Vec::new())
        } else if !rule.conditions.evaluate(document, today) {
            execution.error_details = Some(json!({ "reason": "conditions_not_met" }));
            (ExecutionStatus::Skipped, document.clone(), Vec::new())
        } else {
            match apply_actions(&rule.actions, document, today) {
                Ok(outcome) => {
                    execution.actions_performed = Some(Value::Array(outcome.performed));
                    (ExecutionStatus::Success, outcome.document, outcome.alerts)
                }
                Err(err) => {
                    execution.error_message = Some(err.to_string());
                    execution.error_details = Some(json!({
                        "rule_type": rule.rule_type.label(),
                        "document_status": document.status.label(),
                    }));
                    (ExecutionStatus::Failed, document.clone(), Vec::new())
                }
            }
        };

        let elapsed = Duration::from_std(clock.elapsed()).unwrap_or_else(|_| Duration::zero());
        if let Err(err) = execution.complete(status, now + elapsed) {
            warn!(%err, execution_id = %execution.id.0, "could not finalize workflow execution");
        }

        RuleRun {
            execution,
            document: updated,
            alerts,
        }
    }

    /// Runs ordered rules against a document, threading the document through each success.
    pub fn run_ordered(
        &self,
        ordered: &[WorkflowRule],
        document: &Document,
        mode: MatchMode,
        trigger_event: Option<TriggerEvent>,
        now: DateTime<Utc>,
    ) -> Vec<RuleRun> {
        let mut current = document.clone();
        let mut runs = Vec::new();

        for rule in ordered {
            let run = self.execute(rule, &current, trigger_event, now);
            let status = run.execution.execution_status;
            current = run.document.clone();
            runs.push(run);

            if mode == MatchMode::FirstMatch && status != ExecutionStatus::Skipped {
                break;
            }
        }

        runs
    }

    /// Documents that already expired or expire within the widest enabled alert window.
    pub fn check_expirations(
        &self,
        rules: &[WorkflowRule],
        documents: &[Document],
        today: NaiveDate,
    ) -> Vec<ExpirationNotice> {
        let window = rules
            .iter()
            .filter(|rule| rule.is_enabled && rule.rule_type == RuleType::ExpirationAlert)
            .flat_map(|rule| rule.actions.iter())
            .filter_map(|action| match action {
                RuleAction::ExpirationAlert { days_before } => Some(*days_before),
                _ => None,
            })
            .max()
            .unwrap_or(0);

        let mut notices: Vec<ExpirationNotice> = documents
            .iter()
            .filter_map(|document| {
                let expires_on = document.expires_on?;
                let days = document.days_until_expiry(today)?;
                (days < 0 || days <= window).then(|| ExpirationNotice {
                    document_id: document.id.clone(),
                    title: document.title.clone(),
                    expires_on,
                    days_until_expiry: days,
                    expired: days < 0,
                    message: expiry_message(&document.title, days),
                })
            })
            .collect();

        notices.sort_by(|left, right| {
            left.expires_on
                .cmp(&right.expires_on)
                .then_with(|| left.document_id.cmp(&right.document_id))
        });
        notices
    }

    /// Tags that matching auto-tagging rules would add, in rule order, without duplicates.
    pub fn suggest_tags(
        &self,
        ordered: &[WorkflowRule],
        document: &Document,
        today: NaiveDate,
    ) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut suggestions = Vec::new();

        for rule in ordered.iter().filter(|rule| {
            rule.is_enabled
                && rule.rule_type == RuleType::AutoTagging
                && rule.conditions.evaluate(document, today)
        }) {
            for action in &rule.actions {
                if let RuleAction::AddTags { tags } = action {
                    for tag in tags.iter().map(|tag| tag.trim()) {
                        if !tag.is_empty() && !document.tags.contains(tag) && seen.insert(tag) {
                            suggestions.push(tag.to_string());
                        }
                    }
                }
            }
        }

        suggestions
    }

    pub fn compare_versions(&self, previous: &Document, current: &Document) -> VersionComparison {
        let mut changes = Vec::new();

        for field in ["title", "status", "app_code", "expires_on"] {
            let before = previous.column(field);
            let after = current.column(field);
            if before != after {
                changes.push(FieldChange {
                    field: field.to_string(),
                    previous: before,
                    current: after,
                });
            }
        }

        let keys: BTreeSet<&String> = previous
            .attributes
            .keys()
            .chain(current.attributes.keys())
            .collect();
        for key in keys {
            let before = previous.attributes.get(key);
            let after = current.attributes.get(key);
            if before != after {
                changes.push(FieldChange {
                    field: format!("attributes.{key}"),
                    previous: before.cloned(),
                    current: after.cloned(),
                });
            }
        }

        VersionComparison {
            document_id: current.id.clone(),
            previous_version: previous.version,
            current_version: current.version,
            version_advanced: current.version > previous.version,
            tags_added: current.tags.difference(&previous.tags).cloned().collect(),
            tags_removed: previous.tags.difference(&current.tags).cloned().collect(),
            changes,
        }
    }
}
