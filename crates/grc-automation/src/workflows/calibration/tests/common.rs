use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};

use crate::tenant::{AccessContext, Capability, TenantId};
use crate::workflows::calibration::domain::{
    CalibrationCell, CalibrationRequest, CalibrationRun, OverallStatus, RunId, ScoreBucket,
};
use crate::workflows::calibration::repository::{CalibrationBackend, InMemoryCalibrationBackend};
use crate::workflows::calibration::service::CalibrationService;
use crate::workflows::calibration::stats::OutlierThresholds;

pub(super) fn tenant(raw: &str) -> TenantId {
    TenantId::parse(raw).expect("valid tenant")
}

pub(super) fn analyst(raw: &str) -> AccessContext {
    AccessContext::new(
        Some(tenant(raw)),
        [Capability::CalibrationRead, Capability::CalibrationRun],
    )
}

pub(super) fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).expect("valid date")
}

pub(super) fn run(
    id: &str,
    sample_size: u64,
    avg_gap: Option<f64>,
    correlation: Option<f64>,
    status: OverallStatus,
) -> CalibrationRun {
    CalibrationRun {
        id: RunId(id.to_string()),
        tenant_id: tenant("acme"),
        model_version: 1,
        period_start: None,
        period_end: None,
        run_label: None,
        description: None,
        sample_size,
        avg_validation_gap: avg_gap,
        correlation_score: correlation,
        overall_status: status,
        created_at: Utc
            .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp"),
    }
}

pub(super) fn cell(
    predicted: ScoreBucket,
    actual: ScoreBucket,
    count: u32,
    avg_gap: Option<f64>,
) -> CalibrationCell {
    CalibrationCell {
        run_id: RunId("calrun-test".to_string()),
        tenant_id: tenant("acme"),
        predicted_bucket: predicted,
        actual_bucket: actual,
        count_samples: count,
        avg_gap,
        gap_direction: None,
    }
}

pub(super) fn request(model_version: u32) -> CalibrationRequest {
    CalibrationRequest {
        model_version,
        period_start: None,
        period_end: None,
        run_label: None,
        description: None,
    }
}

/// Backend seeded with samples for `acme` spread across January and February.
pub(super) fn seeded_backend() -> Arc<InMemoryCalibrationBackend> {
    let backend = Arc::new(InMemoryCalibrationBackend::default());
    let acme = tenant("acme");
    for (predicted, actual, observed_on) in [
        (85.0, 90.0, date(1, 5)),
        (82.0, 70.0, date(1, 12)),
        (88.0, 95.0, date(1, 20)),
        (45.0, 15.0, date(2, 3)),
        (12.0, 18.0, date(2, 14)),
    ] {
        backend
            .register_sample(&acme, predicted, actual, observed_on)
            .expect("sample registered");
    }
    backend
        .register_sample(&tenant("globex"), 50.0, 50.0, date(1, 5))
        .expect("foreign sample registered");
    backend
}

pub(super) fn build_service(
    backend: Arc<InMemoryCalibrationBackend>,
) -> CalibrationService<InMemoryCalibrationBackend> {
    CalibrationService::new(backend, OutlierThresholds::default())
}
