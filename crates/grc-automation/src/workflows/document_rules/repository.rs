use chrono::{DateTime, Utc};

use super::domain::{RuleId, WorkflowExecution, WorkflowRule};
use crate::error::GrcError;
use crate::store::TenantTable;
use crate::tenant::TenantId;

/// Storage abstraction for rules and their execution log.
pub trait WorkflowRuleRepository: Send + Sync {
    fn insert(&self, tenant: &TenantId, rule: WorkflowRule) -> Result<WorkflowRule, GrcError>;
    /// Stores user-editable fields; execution counters keep their stored values.
    fn replace(&self, tenant: &TenantId, rule: WorkflowRule) -> Result<WorkflowRule, GrcError>;
    fn fetch(&self, tenant: &TenantId, id: &RuleId) -> Result<Option<WorkflowRule>, GrcError>;
    fn list(&self, tenant: &TenantId) -> Result<Vec<WorkflowRule>, GrcError>;
    fn delete(&self, tenant: &TenantId, id: &RuleId) -> Result<WorkflowRule, GrcError>;
    /// Bumps the execution counter; only the execution engine calls this.
    fn mark_executed(
        &self,
        tenant: &TenantId,
        id: &RuleId,
        at: DateTime<Utc>,
    ) -> Result<WorkflowRule, GrcError>;
    fn record_execution(
        &self,
        tenant: &TenantId,
        execution: WorkflowExecution,
    ) -> Result<(), GrcError>;
    fn executions(
        &self,
        tenant: &TenantId,
        rule_id: Option<&RuleId>,
    ) -> Result<Vec<WorkflowExecution>, GrcError>;
}

#[derive(Debug)]
pub struct InMemoryWorkflowRepository {
    rules: TenantTable<WorkflowRule>,
    executions: TenantTable<WorkflowExecution>,
}

impl Default for InMemoryWorkflowRepository {
    fn default() -> Self {
        Self {
            rules: TenantTable::new("workflow_rule"),
            executions: TenantTable::new("workflow_execution"),
        }
    }
}

impl WorkflowRuleRepository for InMemoryWorkflowRepository {
    fn insert(&self, tenant: &TenantId, rule: WorkflowRule) -> Result<WorkflowRule, GrcError> {
        let key = rule.id.0.clone();
        self.rules.insert(tenant, &key, rule)
    }

    fn replace(&self, tenant: &TenantId, rule: WorkflowRule) -> Result<WorkflowRule, GrcError> {
        let key = rule.id.0.clone();
        self.rules.modify(tenant, &key, move |stored| {
            // Execution bookkeeping belongs to `mark_executed`; a stale copy must not roll it back.
            *stored = WorkflowRule {
                execution_count: stored.execution_count,
                last_executed_at: stored.last_executed_at,
                ..rule
            };
            Ok(())
        })
    }

    fn fetch(&self, tenant: &TenantId, id: &RuleId) -> Result<Option<WorkflowRule>, GrcError> {
        self.rules.get(tenant, &id.0)
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<WorkflowRule>, GrcError> {
        self.rules.list(tenant)
    }

    fn delete(&self, tenant: &TenantId, id: &RuleId) -> Result<WorkflowRule, GrcError> {
        self.rules.remove(tenant, &id.0)
    }

    fn mark_executed(
        &self,
        tenant: &TenantId,
        id: &RuleId,
        at: DateTime<Utc>,
    ) -> Result<WorkflowRule, GrcError> {
        self.rules.modify(tenant, &id.0, |rule| {
            rule.execution_count += 1;
            rule.last_executed_at = Some(at);
            Ok(())
        })
    }

    fn record_execution(
        &self,
        tenant: &TenantId,
        execution: WorkflowExecution,
    ) -> Result<(), GrcError> {
        let key = execution.id.0.clone();
        self.executions.insert(tenant, &key, execution)?;
        Ok(())
    }

    fn executions(
        &self,
        tenant: &TenantId,
        rule_id: Option<&RuleId>,
    ) -> Result<Vec<WorkflowExecution>, GrcError> {
        let mut executions: Vec<WorkflowExecution> = self
            .executions
            .list(tenant)?
            .into_iter()
            .filter(|execution| rule_id.map_or(true, |id| &execution.rule_id == id))
            .collect();
        executions.sort_by(|left, right| {
            right
                .execution_started_at
                .cmp(&left.execution_started_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(executions)
    }
}
