use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::build_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use grc_automation::audit::InMemoryAuditLog;
use grc_automation::config::AppConfig;
use grc_automation::error::AppError;
use grc_automation::telemetry;
use grc_automation::workflows::calibration::{
    CalibrationService, InMemoryCalibrationBackend, OutlierThresholds,
};
use grc_automation::workflows::document_rules::{
    DocumentWorkflowService, InMemoryWorkflowRepository,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let workflow_service = Arc::new(DocumentWorkflowService::new(
        Arc::new(InMemoryWorkflowRepository::default()),
        Arc::new(InMemoryAuditLog::default()),
    ));
    let thresholds = OutlierThresholds::from(&config.calibration);
    let calibration_service = Arc::new(CalibrationService::new(
        Arc::new(InMemoryCalibrationBackend::default()),
        thresholds,
    ));

    let app = build_router(workflow_service, calibration_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        outlier_min_samples = thresholds.min_samples,
        outlier_max_gap = thresholds.max_gap,
        "grc automation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
