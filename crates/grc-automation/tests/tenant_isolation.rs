//! Integration scenarios for tenant isolation across the public stores and services.
//!
//! Each scenario writes rows as one tenant and reads them back as another. Foreign reads and
//! explicit foreign filters come back empty, and foreign writes are refused.

mod common {
    use std::sync::Arc;

    use grc_automation::audit::InMemoryAuditLog;
    use grc_automation::tenant::{AccessContext, TenantId};
    use grc_automation::workflows::document_rules::{
        DocumentWorkflowService, InMemoryWorkflowRepository, RuleAction, RuleCondition, RuleDraft,
        RuleType,
    };

    pub(super) type Workflows =
        DocumentWorkflowService<InMemoryWorkflowRepository, InMemoryAuditLog>;

    pub(super) fn tenant(raw: &str) -> TenantId {
        TenantId::parse(raw).expect("valid tenant")
    }

    pub(super) fn admin(raw: &str) -> AccessContext {
        AccessContext::administrator(tenant(raw))
    }

    pub(super) fn workflows() -> (Workflows, Arc<InMemoryAuditLog>) {
        let audit = Arc::new(InMemoryAuditLog::default());
        let service = DocumentWorkflowService::new(
            Arc::new(InMemoryWorkflowRepository::default()),
            audit.clone(),
        );
        (service, audit)
    }

    pub(super) fn tagging_draft(name: &str) -> RuleDraft {
        RuleDraft {
            rule_name: name.to_string(),
            description: None,
            rule_type: RuleType::AutoTagging,
            conditions: RuleCondition::Always,
            actions: vec![RuleAction::AddTags {
                tags: vec!["reviewed".to_string()],
            }],
            is_enabled: true,
            priority: 50,
            execution_order: 0,
            app_code: None,
        }
    }
}

use chrono::NaiveDate;
use grc_automation::error::GrcError;
use grc_automation::workflows::calibration::{
    CalibrationBackend, CalibrationCell, CalibrationRun, CalibrationService,
    InMemoryCalibrationBackend, OutlierThresholds, OverallStatus, RunId, ScoreBucket,
};
use grc_automation::workflows::campaigns::ParticipantRegistry;
use grc_automation::workflows::document_rules::{
    InMemoryWorkflowRepository, RuleUpdate, WorkflowRuleRepository,
};
use grc_automation::workflows::saved_views::SavedViewStore;
use serde_json::Map;
use std::sync::Arc;

use common::*;

#[test]
fn workflow_rules_stay_inside_their_tenant() {
    let (service, audit) = workflows();
    let created = service
        .create_rule(&admin("acme"), tagging_draft("Review tagging"))
        .expect("rule created");

    let foreign = service.list_rules(&admin("globex")).expect("list succeeds");
    assert!(foreign.is_empty());

    let err = service
        .update_rule(
            &admin("globex"),
            &created.id,
            RuleUpdate {
                priority: Some(99),
                ..RuleUpdate::default()
            },
        )
        .expect_err("foreign update refused");
    assert!(matches!(err, GrcError::NotFound { .. }));

    let err = service
        .delete_rule(&admin("globex"), &created.id, true)
        .expect_err("foreign delete refused");
    assert!(matches!(err, GrcError::NotFound { .. }));

    let own = service.list_rules(&admin("acme")).expect("list succeeds");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].priority, 50);
    assert!(audit.entries_for(&tenant("globex")).is_empty());
    assert_eq!(audit.entries_for(&tenant("acme")).len(), 1);
}

#[test]
fn repositories_reject_rows_written_for_another_tenant() {
    let (service, _) = workflows();
    let rule = service
        .create_rule(&admin("acme"), tagging_draft("Review tagging"))
        .expect("rule created");

    let repository = InMemoryWorkflowRepository::default();
    let err = repository
        .insert(&tenant("globex"), rule)
        .expect_err("cross-tenant insert refused");
    assert!(matches!(err, GrcError::TenantMismatch { .. }));
}

#[test]
fn calibration_runs_and_cells_are_tenant_scoped() {
    let backend = Arc::new(InMemoryCalibrationBackend::default());
    let run = CalibrationRun {
        id: RunId("calrun-acme-1".to_string()),
        tenant_id: tenant("acme"),
        model_version: 1,
        period_start: NaiveDate::from_ymd_opt(2025, 1, 1),
        period_end: NaiveDate::from_ymd_opt(2025, 1, 31),
        run_label: Some("January".to_string()),
        description: None,
        sample_size: 4,
        avg_validation_gap: Some(6.0),
        correlation_score: Some(0.8),
        overall_status: OverallStatus::Good,
        created_at: chrono::Utc::now(),
    };
    let cell = CalibrationCell {
        run_id: run.id.clone(),
        tenant_id: tenant("acme"),
        predicted_bucket: ScoreBucket::High,
        actual_bucket: ScoreBucket::High,
        count_samples: 4,
        avg_gap: Some(6.0),
        gap_direction: None,
    };
    backend
        .import_run(&tenant("acme"), run.clone(), vec![cell])
        .expect("run imported");

    let err = backend
        .import_run(&tenant("globex"), run.clone(), Vec::new())
        .expect_err("foreign import refused");
    assert!(matches!(err, GrcError::TenantMismatch { .. }));

    let service = CalibrationService::new(backend, OutlierThresholds::default());
    assert!(service.list_runs(&admin("globex")).expect("list").is_empty());
    let err = service
        .cells(&admin("globex"), &run.id)
        .expect_err("foreign cells hidden");
    assert!(matches!(err, GrcError::NotFound { .. }));
    assert_eq!(service.cells(&admin("acme"), &run.id).expect("cells").len(), 1);
}

#[test]
fn run_ids_are_independent_per_tenant() {
    let backend = InMemoryCalibrationBackend::default();
    let run_for = |owner: &str, size: u64| CalibrationRun {
        id: RunId("q1".to_string()),
        tenant_id: tenant(owner),
        model_version: 1,
        period_start: None,
        period_end: None,
        run_label: Some(format!("{owner} Q1")),
        description: None,
        sample_size: size,
        avg_validation_gap: None,
        correlation_score: None,
        overall_status: OverallStatus::Unknown,
        created_at: chrono::Utc::now(),
    };
    let cell_for = |owner: &str, count: u32| CalibrationCell {
        run_id: RunId("q1".to_string()),
        tenant_id: tenant(owner),
        predicted_bucket: ScoreBucket::Medium,
        actual_bucket: ScoreBucket::Low,
        count_samples: count,
        avg_gap: Some(12.0),
        gap_direction: None,
    };

    backend
        .import_run(&tenant("acme"), run_for("acme", 3), vec![cell_for("acme", 3)])
        .expect("acme import");
    backend
        .import_run(&tenant("globex"), run_for("globex", 8), vec![cell_for("globex", 8)])
        .expect("globex reuses the run id");

    let service = CalibrationService::new(Arc::new(backend), OutlierThresholds::default());
    let acme_cells = service
        .cells(&admin("acme"), &RunId("q1".to_string()))
        .expect("acme cells");
    let globex_cells = service
        .cells(&admin("globex"), &RunId("q1".to_string()))
        .expect("globex cells");
    assert_eq!(acme_cells.len(), 1);
    assert_eq!(acme_cells[0].count_samples, 3);
    assert_eq!(globex_cells[0].count_samples, 8);
    assert_eq!(
        service.list_runs(&admin("globex")).expect("list")[0].sample_size,
        8
    );
}

#[test]
fn explicit_foreign_filters_return_nothing() {
    let registry = ParticipantRegistry::default();
    registry
        .enroll(&tenant("acme"), "phishing-q1", "emp-100")
        .expect("enrolled");

    let own = registry
        .select(&tenant("acme"), Some(&tenant("acme")))
        .expect("select");
    assert_eq!(own.len(), 1);

    let foreign = registry
        .select(&tenant("acme"), Some(&tenant("globex")))
        .expect("select");
    assert!(foreign.is_empty());

    let as_other = registry.select(&tenant("globex"), None).expect("select");
    assert!(as_other.is_empty());

    let mut smuggled = own[0].clone();
    smuggled.tenant_id = tenant("globex");
    smuggled.id.0.push_str("-copy");
    let err = registry
        .restore(&tenant("acme"), smuggled)
        .expect_err("cross-tenant restore refused");
    assert!(matches!(err, GrcError::TenantMismatch { .. }));
}

#[test]
fn saved_views_do_not_leak_defaults_between_tenants() {
    let views = SavedViewStore::default();
    let acme = views
        .save(&tenant("acme"), "policies", "Expiring soon", Map::new(), true)
        .expect("saved");
    let globex = views
        .save(&tenant("globex"), "policies", "Expiring soon", Map::new(), true)
        .expect("same name allowed for another tenant");

    assert!(acme.is_default);
    assert!(globex.is_default);
    assert_eq!(views.list(&tenant("acme"), "policies").expect("list").len(), 1);

    let err = views
        .delete(&tenant("globex"), &acme.id)
        .expect_err("foreign delete refused");
    assert!(matches!(err, GrcError::NotFound { .. }));
}
