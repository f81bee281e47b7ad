use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::audit::InMemoryAuditLog;
use crate::tenant::{AccessContext, AppCode, Capability, TenantId};
use crate::workflows::document_rules::actions::RuleAction;
use crate::workflows::document_rules::conditions::RuleCondition;
use crate::workflows::document_rules::domain::{
    Document, DocumentId, DocumentStatus, RuleDraft, RuleId, RuleType, WorkflowRule,
};
use crate::workflows::document_rules::repository::InMemoryWorkflowRepository;
use crate::workflows::document_rules::service::DocumentWorkflowService;

pub(super) type MemoryService = DocumentWorkflowService<InMemoryWorkflowRepository, InMemoryAuditLog>;

pub(super) fn tenant(raw: &str) -> TenantId {
    TenantId::parse(raw).expect("valid tenant")
}

pub(super) fn admin(raw: &str) -> AccessContext {
    AccessContext::administrator(tenant(raw))
}

pub(super) fn reader(raw: &str) -> AccessContext {
    AccessContext::new(Some(tenant(raw)), [Capability::RulesRead])
}

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date")
}

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn document(tenant_id: &str) -> Document {
    let mut attributes = BTreeMap::new();
    attributes.insert("department".to_string(), Value::from("finance"));
    attributes.insert("risk_score".to_string(), Value::from(42));

    Document {
        id: DocumentId("doc-001".to_string()),
        tenant_id: tenant(tenant_id),
        app_code: Some(AppCode::new("policy_hub")),
        title: "Access Control Policy".to_string(),
        status: DocumentStatus::PendingApproval,
        tags: BTreeSet::from(["security".to_string()]),
        version: 2,
        expires_on: NaiveDate::from_ymd_opt(2025, 3, 20),
        attributes,
    }
}

pub(super) fn rule(id: &str, tenant_id: &str, priority: i32, execution_order: i32) -> WorkflowRule {
    WorkflowRule {
        id: RuleId(id.to_string()),
        tenant_id: tenant(tenant_id),
        rule_name: format!("Rule {id}"),
        description: None,
        rule_type: RuleType::AutoApproval,
        conditions: RuleCondition::Always,
        actions: vec![RuleAction::Approve { approver: None }],
        is_enabled: true,
        priority,
        execution_order,
        app_code: None,
        last_executed_at: None,
        execution_count: 0,
    }
}

pub(super) fn approval_draft() -> RuleDraft {
    RuleDraft {
        rule_name: "  Auto-approve finance  ".to_string(),
        description: Some("Approves finance documents".to_string()),
        rule_type: RuleType::AutoApproval,
        conditions: RuleCondition::FieldEquals {
            field: "department".to_string(),
            value: Value::from("finance"),
        },
        actions: vec![RuleAction::Approve {
            approver: Some("workflow-bot".to_string()),
        }],
        is_enabled: true,
        priority: 50,
        execution_order: 1,
        app_code: None,
    }
}

pub(super) fn tagging_draft(tags: &[&str]) -> RuleDraft {
    RuleDraft {
        rule_name: "Tag finance".to_string(),
        description: None,
        rule_type: RuleType::AutoTagging,
        conditions: RuleCondition::Always,
        actions: vec![RuleAction::AddTags {
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }],
        is_enabled: true,
        priority: 10,
        execution_order: 1,
        app_code: None,
    }
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryWorkflowRepository>,
    Arc<InMemoryAuditLog>,
) {
    let repository = Arc::new(InMemoryWorkflowRepository::default());
    let audit = Arc::new(InMemoryAuditLog::default());
    let service = DocumentWorkflowService::new(repository.clone(), audit.clone());
    (service, repository, audit)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
