use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::actions::DocumentAlert;
use super::domain::{
    next_rule_id, Document, DocumentId, RuleDraft, RuleId, RuleUpdate, TriggerEvent,
    WorkflowExecution, WorkflowRule,
};
use super::engine::{ExpirationNotice, RuleRun, VersionComparison, WorkflowEngine};
use super::repository::WorkflowRuleRepository;
use super::selector::{applicable_rules, order_rules, MatchMode};
use crate::audit::{AuditEntry, AuditSink};
use crate::error::{GrcError, ValidationError};
use crate::tenant::{AccessContext, AppCode, Capability, TenantId};

/// Automation request routed by its `action` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AutomationRequest {
    ExecuteRule {
        rule_id: RuleId,
        document: Document,
        #[serde(default)]
        trigger_event: Option<TriggerEvent>,
    },
    CheckExpirations {
        documents: Vec<Document>,
        #[serde(default)]
        today: Option<NaiveDate>,
    },
    SuggestTags {
        document: Document,
    },
    CompareVersions {
        previous: Document,
        current: Document,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AutomationResponse {
    ExecuteRule {
        execution: WorkflowExecution,
        document: Document,
        alerts: Vec<DocumentAlert>,
    },
    CheckExpirations {
        notices: Vec<ExpirationNotice>,
    },
    SuggestTags {
        document_id: DocumentId,
        suggested_tags: Vec<String>,
    },
    CompareVersions {
        comparison: VersionComparison,
    },
}

/// Service composing the rule repository, audit sink, and execution engine.
pub struct DocumentWorkflowService<R, A> {
    repository: Arc<R>,
    audit: Arc<A>,
    engine: WorkflowEngine,
}

impl<R, A> DocumentWorkflowService<R, A>
where
    R: WorkflowRuleRepository + 'static,
    A: AuditSink + 'static,
{
    pub fn new(repository: Arc<R>, audit: Arc<A>) -> Self {
        Self {
            repository,
            audit,
            engine: WorkflowEngine::new(),
        }
    }

    /// Enabled rules for the tenant and app scope, in evaluation order.
    pub fn list_applicable_rules(
        &self,
        context: &AccessContext,
        app_code: Option<&AppCode>,
    ) -> Result<Vec<WorkflowRule>, GrcError> {
        let tenant = context.require(Capability::RulesRead)?;
        let rules = self.repository.list(tenant)?;
        Ok(applicable_rules(rules, app_code))
    }

    /// Every rule of the tenant, enabled or not, in evaluation order.
    pub fn list_rules(&self, context: &AccessContext) -> Result<Vec<WorkflowRule>, GrcError> {
        let tenant = context.require(Capability::RulesRead)?;
        let mut rules = self.repository.list(tenant)?;
        order_rules(&mut rules);
        Ok(rules)
    }

    pub fn create_rule(
        &self,
        context: &AccessContext,
        draft: RuleDraft,
    ) -> Result<WorkflowRule, GrcError> {
        let tenant = context.require(Capability::RulesWrite)?;
        draft.validate()?;

        let rule = WorkflowRule::from_draft(next_rule_id(), tenant.clone(), draft);
        let stored = self.repository.insert(tenant, rule)?;

        info!(tenant = %tenant, rule_id = %stored.id.0, rule_type = stored.rule_type.label(), "workflow rule created");
        self.audit_rule(tenant, "workflow_rule.created", &stored);
        Ok(stored)
    }

    pub fn update_rule(
        &self,
        context: &AccessContext,
        rule_id: &RuleId,
        update: RuleUpdate,
    ) -> Result<WorkflowRule, GrcError> {
        let tenant = context.require(Capability::RulesWrite)?;
        let mut rule = self.fetch_rule(tenant, rule_id)?;
        update.apply_to(&mut rule)?;

        let stored = self.repository.replace(tenant, rule)?;
        info!(tenant = %tenant, rule_id = %stored.id.0, "workflow rule updated");
        self.audit_rule(tenant, "workflow_rule.updated", &stored);
        Ok(stored)
    }

    /// Flips `is_enabled`, or forces it when `enabled` is given.
    pub fn toggle_rule(
        &self,
        context: &AccessContext,
        rule_id: &RuleId,
        enabled: Option<bool>,
    ) -> Result<WorkflowRule, GrcError> {
        let tenant = context.require(Capability::RulesWrite)?;
        let mut rule = self.fetch_rule(tenant, rule_id)?;
        rule.is_enabled = enabled.unwrap_or(!rule.is_enabled);

        let stored = self.repository.replace(tenant, rule)?;
        let action = if stored.is_enabled {
            "workflow_rule.enabled"
        } else {
            "workflow_rule.disabled"
        };
        info!(tenant = %tenant, rule_id = %stored.id.0, enabled = stored.is_enabled, "workflow rule toggled");
        self.audit_rule(tenant, action, &stored);
        Ok(stored)
    }

    /// Hard delete. Refused unless the caller confirmed the destructive action.
    pub fn delete_rule(
        &self,
        context: &AccessContext,
        rule_id: &RuleId,
        confirmed: bool,
    ) -> Result<WorkflowRule, GrcError> {
        let tenant = context.require(Capability::RulesWrite)?;
        if !confirmed {
            return Err(ValidationError::ConfirmationRequired {
                action: "delete workflow rule",
            }
            .into());
        }

        let removed = self.repository.delete(tenant, rule_id)?;
        info!(tenant = %tenant, rule_id = %removed.id.0, "workflow rule deleted");
        self.audit_rule(tenant, "workflow_rule.deleted", &removed);
        Ok(removed)
    }

    pub fn execute_rule(
        &self,
        context: &AccessContext,
        rule_id: &RuleId,
        document: &Document,
        trigger_event: Option<TriggerEvent>,
    ) -> Result<RuleRun, GrcError> {
        let tenant = context.require(Capability::RulesExecute)?;
        ensure_document_tenant(tenant, document)?;
        let rule = self.fetch_rule(tenant, rule_id)?;

        let run = self
            .engine
            .execute(&rule, document, trigger_event, Utc::now());
        self.persist_run(tenant, &run)?;
        Ok(run)
    }

    /// Runs the tenant's applicable rules for a document lifecycle event.
    pub fn process_document_event(
        &self,
        context: &AccessContext,
        document: &Document,
        trigger_event: TriggerEvent,
        mode: MatchMode,
    ) -> Result<Vec<RuleRun>, GrcError> {
        let tenant = context.require(Capability::RulesExecute)?;
        ensure_document_tenant(tenant, document)?;

        let rules = applicable_rules(self.repository.list(tenant)?, document.app_code.as_ref());
        let runs = self
            .engine
            .run_ordered(&rules, document, mode, Some(trigger_event), Utc::now());
        for run in &runs {
            self.persist_run(tenant, run)?;
        }
        Ok(runs)
    }

    pub fn run_automation(
        &self,
        context: &AccessContext,
        request: AutomationRequest,
    ) -> Result<AutomationResponse, GrcError> {
        match request {
            AutomationRequest::ExecuteRule {
                rule_id,
                document,
                trigger_event,
            } => {
                let trigger = trigger_event.or(Some(TriggerEvent::Manual));
                let run = self.execute_rule(context, &rule_id, &document, trigger)?;
                Ok(AutomationResponse::ExecuteRule {
                    execution: run.execution,
                    document: run.document,
                    alerts: run.alerts,
                })
            }
            AutomationRequest::CheckExpirations { documents, today } => {
                let tenant = context.require(Capability::RulesRead)?;
                for document in &documents {
                    ensure_document_tenant(tenant, document)?;
                }
                let today = today.unwrap_or_else(|| Utc::now().date_naive());
                let rules = self.repository.list(tenant)?;
                Ok(AutomationResponse::CheckExpirations {
                    notices: self.engine.check_expirations(&rules, &documents, today),
                })
            }
            AutomationRequest::SuggestTags { document } => {
                let tenant = context.require(Capability::RulesRead)?;
                ensure_document_tenant(tenant, &document)?;
                let rules =
                    applicable_rules(self.repository.list(tenant)?, document.app_code.as_ref());
                let suggested_tags =
                    self.engine
                        .suggest_tags(&rules, &document, Utc::now().date_naive());
                Ok(AutomationResponse::SuggestTags {
                    document_id: document.id,
                    suggested_tags,
                })
            }
            AutomationRequest::CompareVersions { previous, current } => {
                let tenant = context.require(Capability::RulesRead)?;
                ensure_document_tenant(tenant, &previous)?;
                ensure_document_tenant(tenant, &current)?;
                Ok(AutomationResponse::CompareVersions {
                    comparison: self.engine.compare_versions(&previous, &current),
                })
            }
        }
    }

    pub fn executions(
        &self,
        context: &AccessContext,
        rule_id: Option<&RuleId>,
    ) -> Result<Vec<WorkflowExecution>, GrcError> {
        let tenant = context.require(Capability::RulesRead)?;
        self.repository.executions(tenant, rule_id)
    }

    fn fetch_rule(&self, tenant: &TenantId, rule_id: &RuleId) -> Result<WorkflowRule, GrcError> {
        self.repository
            .fetch(tenant, rule_id)?
            .ok_or_else(|| GrcError::not_found("workflow_rule", rule_id.0.clone()))
    }

    fn persist_run(&self, tenant: &TenantId, run: &RuleRun) -> Result<(), GrcError> {
        let execution = &run.execution;
        self.repository.record_execution(tenant, execution.clone())?;
        self.repository.mark_executed(
            tenant,
            &execution.rule_id,
            execution
                .execution_completed_at
                .unwrap_or(execution.execution_started_at),
        )?;

        info!(
            tenant = %tenant,
            rule_id = %execution.rule_id.0,
            document_id = %execution.document_id.0,
            status = execution.execution_status.label(),
            "workflow rule executed"
        );
        if let Some(message) = &execution.error_message {
            warn!(tenant = %tenant, rule_id = %execution.rule_id.0, %message, "workflow rule failed");
        }
        Ok(())
    }

    fn audit_rule(&self, tenant: &TenantId, action: &str, rule: &WorkflowRule) {
        let entry = AuditEntry::new(tenant.clone(), action, "document_workflow_rule", &rule.id.0)
            .with_metadata("rule_name", rule.rule_name.clone())
            .with_metadata("rule_type", rule.rule_type.label());

        if let Err(err) = self.audit.record(entry) {
            warn!(tenant = %tenant, rule_id = %rule.id.0, %err, "audit log write failed");
        }
    }
}

fn ensure_document_tenant(tenant: &TenantId, document: &Document) -> Result<(), GrcError> {
    if &document.tenant_id != tenant {
        return Err(GrcError::TenantMismatch {
            expected: tenant.to_string(),
            found: document.tenant_id.to_string(),
        });
    }
    Ok(())
}
