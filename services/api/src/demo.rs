use chrono::{Duration, NaiveDate, Utc};
use clap::Args;
use grc_automation::audit::InMemoryAuditLog;
use grc_automation::error::AppError;
use grc_automation::tenant::{AccessContext, AppCode, TenantId};
use grc_automation::workflows::calibration::{
    CalibrationBackend, CalibrationRequest, CalibrationService, CalibrationSummary,
    InMemoryCalibrationBackend, OutlierThresholds, WeightComparisonReport, WeightSet,
};
use grc_automation::workflows::document_rules::{
    AutomationRequest, AutomationResponse, Document, DocumentId, DocumentStatus,
    DocumentWorkflowService, InMemoryWorkflowRepository, MatchMode, RuleAction, RuleCondition,
    RuleDraft, RuleRun, RuleType, TriggerEvent, WorkflowRule,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Tenant the demo data is seeded for
    #[arg(long, default_value = "acme")]
    pub(crate) tenant: String,
    /// Stop at the first matching rule instead of applying every match
    #[arg(long)]
    pub(crate) first_match: bool,
}

type DemoWorkflows = DocumentWorkflowService<InMemoryWorkflowRepository, InMemoryAuditLog>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let tenant = TenantId::parse(&args.tenant)?;
    let context = AccessContext::administrator(tenant.clone());
    let today = Utc::now().date_naive();
    let mode = if args.first_match {
        MatchMode::FirstMatch
    } else {
        MatchMode::AllMatches
    };

    println!("GRC automation demo for tenant {tenant}");

    let audit = Arc::new(InMemoryAuditLog::default());
    let workflows = DocumentWorkflowService::new(
        Arc::new(InMemoryWorkflowRepository::default()),
        audit.clone(),
    );
    seed_rules(&workflows, &context)?;

    let rules = workflows.list_applicable_rules(&context, Some(&AppCode::new("policy_hub")))?;
    render_rule_order(&rules);

    let document = demo_document(&tenant, today);
    let runs = workflows.process_document_event(
        &context,
        &document,
        TriggerEvent::DocumentSubmitted,
        mode,
    )?;
    render_runs(&runs);

    if let AutomationResponse::CheckExpirations { notices } = workflows.run_automation(
        &context,
        AutomationRequest::CheckExpirations {
            documents: vec![document.clone()],
            today: Some(today),
        },
    )? {
        if notices.is_empty() {
            println!("\nExpiration check: nothing due");
        } else {
            println!("\nExpiration check");
            for notice in notices {
                println!("  {}", notice.message);
            }
        }
    }

    println!(
        "\nAudit trail: {} entr(ies) recorded",
        audit.entries_for(&tenant).len()
    );

    let backend = Arc::new(InMemoryCalibrationBackend::default());
    seed_samples(&backend, &tenant, today)?;
    let calibration = CalibrationService::new(backend.clone(), OutlierThresholds::default());
    run_demo_calibrations(&calibration, &context, today)?;

    let summary = calibration.summary(&context)?;
    render_summary(&summary);

    if let Some(latest) = &summary.latest_run {
        let outliers = calibration.outliers(&context, &latest.id)?;
        let thresholds = calibration.thresholds();
        println!(
            "\nOutlier cells for {} (min samples {}, max gap {:.1})",
            latest.id.0, thresholds.min_samples, thresholds.max_gap
        );
        for cell in outliers {
            println!(
                "  {} -> {}: {} sample(s), gap {}",
                cell.predicted_bucket.label(),
                cell.actual_bucket.label(),
                cell.count_samples,
                cell.avg_gap
                    .map(|gap| format!("{gap:.1}"))
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
    }

    backend.publish_weights(
        &tenant,
        1,
        WeightSet {
            engagement: 0.4,
            completion: 0.3,
            feedback_quality: 0.2,
            compliance_linkage: 0.1,
        },
    )?;
    let suggestion = backend.add_suggestion(
        &tenant,
        1,
        WeightSet {
            engagement: 0.3,
            completion: 0.3,
            feedback_quality: 0.25,
            compliance_linkage: 0.15,
        },
        Some("feedback quality tracks outcomes more closely".to_string()),
    )?;
    let report = calibration.compare_suggestion(&context, &suggestion.id)?;
    render_weight_report(&report);

    Ok(())
}

fn seed_rules(workflows: &DemoWorkflows, context: &AccessContext) -> Result<(), AppError> {
    let drafts = [
        RuleDraft {
            rule_name: "Finance policy approval".to_string(),
            description: Some("Approve finance policies that passed review".to_string()),
            rule_type: RuleType::AutoApproval,
            conditions: RuleCondition::All {
                conditions: vec![
                    RuleCondition::FieldEquals {
                        field: "department".to_string(),
                        value: json!("finance"),
                    },
                    RuleCondition::StatusIs {
                        status: DocumentStatus::PendingApproval,
                    },
                ],
            },
            actions: vec![
                RuleAction::Approve {
                    approver: Some("compliance-bot".to_string()),
                },
                RuleAction::Notify {
                    channel: "grc-approvals".to_string(),
                    message: "Finance policy approved automatically".to_string(),
                },
            ],
            is_enabled: true,
            priority: 80,
            execution_order: 0,
            app_code: Some(AppCode::new("policy_hub")),
        },
        RuleDraft {
            rule_name: "High risk tagging".to_string(),
            description: None,
            rule_type: RuleType::AutoTagging,
            conditions: RuleCondition::FieldInRange {
                field: "risk_score".to_string(),
                min: Some(40.0),
                max: None,
            },
            actions: vec![RuleAction::AddTags {
                tags: vec!["high-risk".to_string(), "security".to_string()],
            }],
            is_enabled: true,
            priority: 60,
            execution_order: 0,
            app_code: None,
        },
        RuleDraft {
            rule_name: "Expiry watch".to_string(),
            description: None,
            rule_type: RuleType::ExpirationAlert,
            conditions: RuleCondition::ExpiresWithin { days: 30 },
            actions: vec![RuleAction::ExpirationAlert { days_before: 30 }],
            is_enabled: true,
            priority: 60,
            execution_order: 1,
            app_code: None,
        },
        RuleDraft {
            rule_name: "Legacy archive sweep".to_string(),
            description: None,
            rule_type: RuleType::AutoTagging,
            conditions: RuleCondition::Always,
            actions: vec![RuleAction::AddTags {
                tags: vec!["legacy".to_string()],
            }],
            is_enabled: false,
            priority: 90,
            execution_order: 0,
            app_code: None,
        },
    ];

    for draft in drafts {
        workflows.create_rule(context, draft)?;
    }
    Ok(())
}

fn demo_document(tenant: &TenantId, today: NaiveDate) -> Document {
    Document {
        id: DocumentId("doc-vendor-risk-policy".to_string()),
        tenant_id: tenant.clone(),
        app_code: Some(AppCode::new("policy_hub")),
        title: "Vendor Risk Management Policy".to_string(),
        status: DocumentStatus::PendingApproval,
        tags: BTreeSet::from(["policy".to_string()]),
        version: 3,
        expires_on: Some(today + Duration::days(21)),
        attributes: [
            ("department".to_string(), json!("finance")),
            ("risk_score".to_string(), json!(64)),
        ]
        .into_iter()
        .collect(),
    }
}

fn seed_samples(
    backend: &InMemoryCalibrationBackend,
    tenant: &TenantId,
    today: NaiveDate,
) -> Result<(), AppError> {
    let previous = today - Duration::days(45);
    let recent = today - Duration::days(10);
    let samples = [
        (82.0, 78.0, previous),
        (85.0, 60.0, previous),
        (35.0, 42.0, previous),
        (55.0, 51.0, previous),
        (88.0, 84.0, recent),
        (91.0, 89.0, recent),
        (47.0, 52.0, recent),
        (22.0, 71.0, recent),
        (64.0, 61.0, recent),
    ];
    for (predicted, actual, observed_on) in samples {
        backend.register_sample(tenant, predicted, actual, observed_on)?;
    }
    Ok(())
}

fn run_demo_calibrations(
    calibration: &CalibrationService<InMemoryCalibrationBackend>,
    context: &AccessContext,
    today: NaiveDate,
) -> Result<(), AppError> {
    let cutoff = today - Duration::days(30);
    let periods = [
        ("Baseline", 1, None, Some(cutoff)),
        ("Current", 2, Some(cutoff + Duration::days(1)), Some(today)),
    ];
    for (label, model_version, period_start, period_end) in periods {
        calibration.run_calibration(
            context,
            CalibrationRequest {
                model_version,
                period_start,
                period_end,
                run_label: Some(label.to_string()),
                description: None,
            },
        )?;
    }
    Ok(())
}

fn render_rule_order(rules: &[WorkflowRule]) {
    println!("\nApplicable rules (policy_hub)");
    for (position, rule) in rules.iter().enumerate() {
        println!(
            "  {}. {} [{}] priority {} order {}",
            position + 1,
            rule.rule_name,
            rule.rule_type.label(),
            rule.priority,
            rule.execution_order
        );
    }
}

fn render_runs(runs: &[RuleRun]) {
    println!("\nDocument submitted");
    for run in runs {
        let execution = &run.execution;
        println!(
            "  {} -> {}",
            execution.rule_id.0,
            execution.execution_status.label()
        );
        for alert in &run.alerts {
            println!("    alert: {}", alert.message);
        }
    }
    if let Some(last) = runs.last() {
        let tags: Vec<&str> = last.document.tags.iter().map(String::as_str).collect();
        println!(
            "  Final status {} with tags [{}]",
            last.document.status.label(),
            tags.join(", ")
        );
    }
}

fn render_summary(summary: &CalibrationSummary) {
    println!("\nCalibration summary");
    println!("  Runs: {}", summary.run_count);
    println!("  Total validations: {}", summary.stats.total_validations);
    println!(
        "  Average gap: {:.1} ({})",
        summary.stats.avg_gap, summary.accuracy
    );
    for point in &summary.trend {
        println!(
            "  {:<10} gap {}",
            point.label,
            point
                .avg_gap
                .map(|gap| format!("{gap:.1}"))
                .unwrap_or_else(|| "n/a".to_string())
        );
    }
}

fn render_weight_report(report: &WeightComparisonReport) {
    println!("\nSuggested weight changes");
    for row in &report.comparisons {
        println!(
            "  {:<20} {:.2} -> {:.2} ({:+.2})",
            row.label, row.current, row.suggested, row.change
        );
    }
    println!(
        "  Totals: {:.2} -> {:.2}{}",
        report.current_total,
        report.suggested_total,
        if report.suggested_normalized {
            ""
        } else {
            " (suggestion is not normalized)"
        }
    );
}
