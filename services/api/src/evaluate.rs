use crate::infra::read_json;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Args;
use grc_automation::config::AppConfig;
use grc_automation::error::AppError;
use grc_automation::workflows::calibration::{
    classify_outliers_with, sort_runs_by_period, CalibrationCell, CalibrationRun,
    CalibrationSummary, OutlierThresholds,
};
use grc_automation::workflows::document_rules::{
    applicable_rules, select_matching, Document, MatchMode, RuleId, RuleRun, TriggerEvent,
    WorkflowEngine, WorkflowRule,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct RulesEvaluateArgs {
    /// JSON array of workflow rules
    #[arg(long)]
    pub(crate) rules: PathBuf,
    /// JSON document the rules are evaluated against
    #[arg(long)]
    pub(crate) document: PathBuf,
    /// Apply every matching rule instead of stopping at the first
    #[arg(long)]
    pub(crate) all: bool,
    /// Evaluation date (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct CalibrationSummaryArgs {
    /// JSON array of calibration runs
    #[arg(long)]
    pub(crate) runs: PathBuf,
    /// Optional JSON array of calibration cells used for outlier review
    #[arg(long)]
    pub(crate) cells: Option<PathBuf>,
    /// Print the summary as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

/// Rules in evaluation order with the ones whose conditions hold, plus the resulting runs.
#[derive(Debug)]
pub(crate) struct RuleEvaluation {
    pub(crate) ordered: Vec<WorkflowRule>,
    pub(crate) matched: Vec<RuleId>,
    pub(crate) ignored: usize,
    pub(crate) runs: Vec<RuleRun>,
}

pub(crate) fn evaluate_rules(
    rules: Vec<WorkflowRule>,
    document: &Document,
    mode: MatchMode,
    now: DateTime<Utc>,
) -> Result<RuleEvaluation, AppError> {
    for rule in &rules {
        rule.validate()?;
    }

    let total = rules.len();
    let same_tenant = rules
        .into_iter()
        .filter(|rule| rule.tenant_id == document.tenant_id);
    let ordered = applicable_rules(same_tenant, document.app_code.as_ref());
    let ignored = total - ordered.len();

    let matched = select_matching(&ordered, document, now.date_naive(), mode)
        .into_iter()
        .map(|rule| rule.id.clone())
        .collect();
    let runs = WorkflowEngine::new().run_ordered(
        &ordered,
        document,
        mode,
        Some(TriggerEvent::Manual),
        now,
    );

    Ok(RuleEvaluation {
        ordered,
        matched,
        ignored,
        runs,
    })
}

pub(crate) fn run_rules_evaluate(args: RulesEvaluateArgs) -> Result<(), AppError> {
    let RulesEvaluateArgs {
        rules,
        document,
        all,
        today,
    } = args;

    let rules: Vec<WorkflowRule> = read_json(&rules)?;
    let document: Document = read_json(&document)?;
    let mode = if all {
        MatchMode::AllMatches
    } else {
        MatchMode::FirstMatch
    };
    let now = today
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or_else(Utc::now);

    let evaluation = evaluate_rules(rules, &document, mode, now)?;
    render_rule_evaluation(&document, &evaluation);
    Ok(())
}

fn render_rule_evaluation(document: &Document, evaluation: &RuleEvaluation) {
    println!(
        "Document {} \"{}\" (tenant {}, status {}, version {})",
        document.id.0,
        document.title,
        document.tenant_id,
        document.status.label(),
        document.version
    );
    if evaluation.ignored > 0 {
        println!(
            "Ignored {} rule(s) that are disabled, scoped elsewhere, or owned by another tenant",
            evaluation.ignored
        );
    }

    if evaluation.ordered.is_empty() {
        println!("\nNo applicable rules");
        return;
    }

    println!("\nEvaluation order");
    for (position, rule) in evaluation.ordered.iter().enumerate() {
        let marker = if evaluation.matched.contains(&rule.id) {
            "match"
        } else {
            "-"
        };
        println!(
            "  {:>2}. [{:<5}] {} ({}, priority {}, order {})",
            position + 1,
            marker,
            rule.rule_name,
            rule.rule_type.label(),
            rule.priority,
            rule.execution_order
        );
    }

    println!("\nExecutions");
    for run in &evaluation.runs {
        let execution = &run.execution;
        println!(
            "  {} -> {} ({} ms)",
            execution.rule_id.0,
            execution.execution_status.label(),
            execution.execution_duration_ms.unwrap_or_default()
        );
        if let Some(message) = &execution.error_message {
            println!("    error: {message}");
        }
        for alert in &run.alerts {
            println!("    alert: {}", alert.message);
        }
    }

    if let Some(last) = evaluation.runs.last() {
        let tags: Vec<&str> = last.document.tags.iter().map(String::as_str).collect();
        println!(
            "\nResulting document: status {}, tags [{}]",
            last.document.status.label(),
            tags.join(", ")
        );
    }
}

pub(crate) fn run_calibration_summary(args: CalibrationSummaryArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let thresholds = OutlierThresholds::from(&config.calibration);

    let mut runs: Vec<CalibrationRun> = read_json(&args.runs)?;
    sort_runs_by_period(&mut runs);
    let summary = CalibrationSummary::from_runs(&runs);

    let cells: Vec<CalibrationCell> = match &args.cells {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let outliers = outliers_by_run(&cells, &thresholds);

    if args.json {
        let payload = serde_json::json!({
            "summary": summary,
            "thresholds": thresholds,
            "outliers": outliers,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    render_calibration_summary(&summary, &outliers, &thresholds);
    Ok(())
}

/// Outlier cells grouped by the run they belong to.
pub(crate) fn outliers_by_run(
    cells: &[CalibrationCell],
    thresholds: &OutlierThresholds,
) -> BTreeMap<String, Vec<CalibrationCell>> {
    let mut grouped: BTreeMap<String, Vec<CalibrationCell>> = BTreeMap::new();
    for cell in classify_outliers_with(cells, thresholds) {
        grouped.entry(cell.run_id.0.clone()).or_default().push(cell);
    }
    grouped
}

fn render_calibration_summary(
    summary: &CalibrationSummary,
    outliers: &BTreeMap<String, Vec<CalibrationCell>>,
    thresholds: &OutlierThresholds,
) {
    let stats = &summary.stats;
    println!("Calibration summary ({} run(s))", summary.run_count);
    println!("  Total validations: {}", stats.total_validations);
    println!(
        "  Average gap: {:.1} ({})",
        stats.avg_gap, summary.accuracy
    );
    println!("  Average correlation: {:.2}", stats.avg_correlation);
    if !stats.status_counts.is_empty() {
        let histogram: Vec<String> = stats
            .status_counts
            .iter()
            .map(|(status, count)| format!("{}={count}", status.label()))
            .collect();
        println!("  Status counts: {}", histogram.join(", "));
    }

    if !summary.trend.is_empty() {
        println!("\nTrend");
        for point in &summary.trend {
            let gap = point
                .avg_gap
                .map(|gap| format!("{gap:.1}"))
                .unwrap_or_else(|| "n/a".to_string());
            println!("  {:<16} gap {gap}", point.label);
        }
    }

    if outliers.is_empty() {
        println!(
            "\nOutlier cells: none (min samples {}, max gap {:.1})",
            thresholds.min_samples, thresholds.max_gap
        );
        return;
    }

    println!(
        "\nOutlier cells (min samples {}, max gap {:.1})",
        thresholds.min_samples, thresholds.max_gap
    );
    for (run_id, cells) in outliers {
        println!("  {run_id}");
        for cell in cells {
            let gap = cell
                .avg_gap
                .map(|gap| format!("{gap:.1}"))
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "    {} -> {}: {} sample(s), gap {gap}",
                cell.predicted_bucket.label(),
                cell.actual_bucket.label(),
                cell.count_samples
            );
        }
    }
}
