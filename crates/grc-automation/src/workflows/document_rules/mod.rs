//! Document workflow rules: priority-ordered condition -> action automation.

pub mod actions;
pub mod conditions;
pub mod domain;
pub mod engine;
pub mod repository;
pub mod router;
pub mod selector;
pub mod service;

#[cfg(test)]
mod tests;

pub use actions::{apply_actions, ActionError, AlertKind, DocumentAlert, RuleAction};
pub use conditions::RuleCondition;
pub use domain::{
    Document, DocumentId, DocumentStatus, ExecutionError, ExecutionId, ExecutionStatus,
    RuleDraft, RuleId, RuleType, RuleUpdate, TriggerEvent, WorkflowExecution, WorkflowRule,
};
pub use engine::{ExpirationNotice, FieldChange, RuleRun, VersionComparison, WorkflowEngine};
pub use repository::{InMemoryWorkflowRepository, WorkflowRuleRepository};
pub use router::workflow_rule_router;
pub use selector::{applicable_rules, evaluate, order_rules, rule_ordering, select_matching, MatchMode};
pub use service::{AutomationRequest, AutomationResponse, DocumentWorkflowService};
