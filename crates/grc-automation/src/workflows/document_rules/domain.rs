use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::actions::RuleAction;
use super::conditions::RuleCondition;
use crate::error::{GrcError, ValidationError};
use crate::tenant::{AppCode, TenantId, TenantOwned};

pub const MIN_PRIORITY: i32 = 0;
pub const MAX_PRIORITY: i32 = 100;

/// Identifier wrapper for workflow rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

static RULE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static EXECUTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_rule_id() -> RuleId {
    let id = RULE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RuleId(format!("rule-{id:06}"))
}

pub(crate) fn next_execution_id() -> ExecutionId {
    let id = EXECUTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ExecutionId(format!("exec-{id:08}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    AutoApproval,
    ExpirationAlert,
    AutoTagging,
    VersionAlert,
}

impl RuleType {
    pub const fn label(self) -> &'static str {
        match self {
            RuleType::AutoApproval => "auto_approval",
            RuleType::ExpirationAlert => "expiration_alert",
            RuleType::AutoTagging => "auto_tagging",
            RuleType::VersionAlert => "version_alert",
        }
    }
}

/// Tenant-configured condition -> action pair applied to documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRule {
    pub id: RuleId,
    pub tenant_id: TenantId,
    pub rule_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub rule_type: RuleType,
    pub conditions: RuleCondition,
    pub actions: Vec<RuleAction>,
    pub is_enabled: bool,
    pub priority: i32,
    pub execution_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_code: Option<AppCode>,
    #[serde(default)]
    pub last_executed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub execution_count: u64,
}

impl WorkflowRule {
    pub fn from_draft(id: RuleId, tenant_id: TenantId, draft: RuleDraft) -> Self {
        Self {
            id,
            tenant_id,
            rule_name: draft.rule_name.trim().to_string(),
            description: draft.description,
            rule_type: draft.rule_type,
            conditions: draft.conditions,
            actions: draft.actions,
            is_enabled: draft.is_enabled,
            priority: draft.priority,
            execution_order: draft.execution_order,
            app_code: draft.app_code,
            last_executed_at: None,
            execution_count: 0,
        }
    }

    /// A rule without an app code applies to every app.
    pub fn applies_to(&self, app_code: Option<&AppCode>) -> bool {
        match &self.app_code {
            None => true,
            Some(scope) => Some(scope) == app_code,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.rule_name, self.priority, &self.actions)
    }
}

impl TenantOwned for WorkflowRule {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

fn validate_fields(
    rule_name: &str,
    priority: i32,
    actions: &[RuleAction],
) -> Result<(), ValidationError> {
    if rule_name.trim().is_empty() {
        return Err(ValidationError::Empty { field: "rule_name" });
    }
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(ValidationError::OutOfRange {
            field: "priority",
            min: MIN_PRIORITY as i64,
            max: MAX_PRIORITY as i64,
            found: priority as i64,
        });
    }
    for action in actions {
        if let RuleAction::ExpirationAlert { days_before } = action {
            if *days_before < 0 {
                return Err(ValidationError::Negative {
                    field: "days_before",
                    found: *days_before,
                });
            }
        }
    }
    Ok(())
}

fn enabled_by_default() -> bool {
    true
}

/// Payload for creating a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub rule_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub rule_type: RuleType,
    #[serde(default)]
    pub conditions: RuleCondition,
    #[serde(default)]
    pub actions: Vec<RuleAction>,
    #[serde(default = "enabled_by_default")]
    pub is_enabled: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub execution_order: i32,
    #[serde(default)]
    pub app_code: Option<AppCode>,
}

impl RuleDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.rule_name, self.priority, &self.actions)
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleUpdate {
    #[serde(default)]
    pub rule_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub clear_description: bool,
    #[serde(default)]
    pub conditions: Option<RuleCondition>,
    #[serde(default)]
    pub actions: Option<Vec<RuleAction>>,
    #[serde(default)]
    pub is_enabled: Option<bool>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub execution_order: Option<i32>,
    #[serde(default)]
    pub app_code: Option<AppCode>,
    #[serde(default)]
    pub clear_app_code: bool,
}

impl RuleUpdate {
    pub fn apply_to(self, rule: &mut WorkflowRule) -> Result<(), ValidationError> {
        if let Some(name) = self.rule_name {
            rule.rule_name = name.trim().to_string();
        }
        if self.clear_description {
            rule.description = None;
        } else if let Some(description) = self.description {
            rule.description = Some(description);
        }
        if let Some(conditions) = self.conditions {
            rule.conditions = conditions;
        }
        if let Some(actions) = self.actions {
            rule.actions = actions;
        }
        if let Some(enabled) = self.is_enabled {
            rule.is_enabled = enabled;
        }
        if let Some(priority) = self.priority {
            rule.priority = priority;
        }
        if let Some(order) = self.execution_order {
            rule.execution_order = order;
        }
        if self.clear_app_code {
            rule.app_code = None;
        } else if let Some(code) = self.app_code {
            rule.app_code = Some(code);
        }
        rule.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    PendingApproval,
    Approved,
    Archived,
}

impl DocumentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::PendingApproval => "pending_approval",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Archived => "archived",
        }
    }
}

fn first_version() -> u32 {
    1
}

/// Governed document targeted by workflow rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub tenant_id: TenantId,
    #[serde(default)]
    pub app_code: Option<AppCode>,
    pub title: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Document {
    /// Resolves a condition field: free-form attributes first, then the typed columns.
    pub fn field(&self, name: &str) -> Option<Value> {
        match self.attributes.get(name) {
            Some(value) => Some(value.clone()),
            None => self.column(name),
        }
    }

    /// Typed column lookup that ignores same-named attributes.
    pub fn column(&self, name: &str) -> Option<Value> {
        match name {
            "title" => Some(Value::String(self.title.clone())),
            "status" => Some(Value::String(self.status.label().to_string())),
            "version" => Some(json!(self.version)),
            "app_code" => self
                .app_code
                .as_ref()
                .map(|code| Value::String(code.0.clone())),
            "expires_on" => self
                .expires_on
                .map(|date| Value::String(date.format("%Y-%m-%d").to_string())),
            _ => None,
        }
    }

    /// Days until expiry relative to `today`; negative once expired.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expires_on
            .map(|expires_on| (expires_on - today).num_days())
    }
}

impl TenantOwned for Document {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    DocumentCreated,
    DocumentUpdated,
    DocumentSubmitted,
    Scheduled,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Skipped,
    Pending,
}

impl ExecutionStatus {
    pub const fn is_terminal(self) -> bool {
        !matches!(self, ExecutionStatus::Pending)
    }

    pub const fn label(self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Skipped => "skipped",
            ExecutionStatus::Pending => "pending",
        }
    }
}

/// Log row written each time a rule fires against a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: ExecutionId,
    pub rule_id: RuleId,
    pub document_id: DocumentId,
    pub tenant_id: TenantId,
    pub execution_status: ExecutionStatus,
    pub execution_started_at: DateTime<Utc>,
    pub execution_completed_at: Option<DateTime<Utc>>,
    pub execution_duration_ms: Option<i64>,
    pub actions_performed: Option<Value>,
    pub error_message: Option<String>,
    pub error_details: Option<Value>,
    pub trigger_event: Option<TriggerEvent>,
}

impl WorkflowExecution {
    pub fn start(
        rule: &WorkflowRule,
        document: &Document,
        trigger_event: Option<TriggerEvent>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: next_execution_id(),
            rule_id: rule.id.clone(),
            document_id: document.id.clone(),
            tenant_id: rule.tenant_id.clone(),
            execution_status: ExecutionStatus::Pending,
            execution_started_at: started_at,
            execution_completed_at: None,
            execution_duration_ms: None,
            actions_performed: None,
            error_message: None,
            error_details: None,
            trigger_event,
        }
    }

    /// Moves a pending execution to a terminal status; the duration is derived from the timestamps.
    pub fn complete(
        &mut self,
        status: ExecutionStatus,
        completed_at: DateTime<Utc>,
    ) -> Result<(), ExecutionError> {
        if self.execution_status.is_terminal() {
            return Err(ExecutionError::AlreadyFinal {
                id: self.id.clone(),
                status: self.execution_status,
            });
        }
        if !status.is_terminal() {
            return Err(ExecutionError::NonTerminalStatus);
        }
        if completed_at < self.execution_started_at {
            return Err(ExecutionError::CompletedBeforeStart);
        }

        self.execution_status = status;
        self.execution_completed_at = Some(completed_at);
        self.execution_duration_ms =
            Some((completed_at - self.execution_started_at).num_milliseconds());
        Ok(())
    }
}

impl TenantOwned for WorkflowExecution {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error("execution {} is already {}", .id.0, .status.label())]
    AlreadyFinal {
        id: ExecutionId,
        status: ExecutionStatus,
    },
    #[error("executions can only complete with a terminal status")]
    NonTerminalStatus,
    #[error("completion timestamp precedes the start timestamp")]
    CompletedBeforeStart,
}

impl From<ExecutionError> for GrcError {
    fn from(value: ExecutionError) -> Self {
        GrcError::Conflict {
            resource: "workflow_execution",
            detail: value.to_string(),
        }
    }
}
