use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::tenant::{TenantId, TenantOwned};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(pub String);

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static SAMPLE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_run_id() -> RunId {
    let id = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RunId(format!("calrun-{id:06}"))
}

pub(crate) fn next_sample_id() -> SampleId {
    let id = SAMPLE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SampleId(format!("sample-{id:08}"))
}

/// Backend-assigned verdict for a run. The in-memory backend never classifies runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Good,
    NeedsTuning,
    Bad,
    #[default]
    Unknown,
}

impl OverallStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OverallStatus::Good => "good",
            OverallStatus::NeedsTuning => "needs_tuning",
            OverallStatus::Bad => "bad",
            OverallStatus::Unknown => "unknown",
        }
    }
}

/// Score band of width 20; the top band also holds a perfect 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBucket {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ScoreBucket {
    pub const fn ordered() -> [ScoreBucket; 5] {
        [
            ScoreBucket::VeryLow,
            ScoreBucket::Low,
            ScoreBucket::Medium,
            ScoreBucket::High,
            ScoreBucket::VeryHigh,
        ]
    }

    /// Bucket for a score in `[0, 100]`; anything else has no bucket.
    pub fn from_score(score: f64) -> Option<Self> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return None;
        }
        let bucket = match score {
            s if s < 20.0 => ScoreBucket::VeryLow,
            s if s < 40.0 => ScoreBucket::Low,
            s if s < 60.0 => ScoreBucket::Medium,
            s if s < 80.0 => ScoreBucket::High,
            _ => ScoreBucket::VeryHigh,
        };
        Some(bucket)
    }

    pub const fn label(self) -> &'static str {
        match self {
            ScoreBucket::VeryLow => "very_low",
            ScoreBucket::Low => "low",
            ScoreBucket::Medium => "medium",
            ScoreBucket::High => "high",
            ScoreBucket::VeryHigh => "very_high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapDirection {
    Overestimate,
    Underestimate,
    Balanced,
}

impl GapDirection {
    /// Mean signed gaps within this distance of zero count as balanced.
    pub const BALANCED_TOLERANCE: f64 = 5.0;

    pub fn from_mean_signed_gap(mean: f64) -> Self {
        if mean > Self::BALANCED_TOLERANCE {
            GapDirection::Overestimate
        } else if mean < -Self::BALANCED_TOLERANCE {
            GapDirection::Underestimate
        } else {
            GapDirection::Balanced
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            GapDirection::Overestimate => "overestimate",
            GapDirection::Underestimate => "underestimate",
            GapDirection::Balanced => "balanced",
        }
    }
}

/// Display label for a run's average validation gap.
pub fn accuracy_label(avg_gap: Option<f64>) -> &'static str {
    match avg_gap {
        None => "No Data",
        Some(gap) if gap <= 10.0 => "High Accuracy",
        Some(gap) if gap <= 20.0 => "Moderate Accuracy",
        Some(_) => "Needs Calibration",
    }
}

/// Batch evaluation of predicted against actual scores. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRun {
    pub id: RunId,
    pub tenant_id: TenantId,
    pub model_version: u32,
    #[serde(default)]
    pub period_start: Option<NaiveDate>,
    #[serde(default)]
    pub period_end: Option<NaiveDate>,
    #[serde(default)]
    pub run_label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub sample_size: u64,
    #[serde(default)]
    pub avg_validation_gap: Option<f64>,
    #[serde(default)]
    pub correlation_score: Option<f64>,
    #[serde(default)]
    pub overall_status: OverallStatus,
    pub created_at: DateTime<Utc>,
}

impl CalibrationRun {
    pub fn accuracy_label(&self) -> &'static str {
        accuracy_label(self.avg_validation_gap)
    }
}

impl TenantOwned for CalibrationRun {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// One (predicted bucket, actual bucket) pairing of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCell {
    pub run_id: RunId,
    pub tenant_id: TenantId,
    pub predicted_bucket: ScoreBucket,
    pub actual_bucket: ScoreBucket,
    pub count_samples: u32,
    #[serde(default)]
    pub avg_gap: Option<f64>,
    #[serde(default)]
    pub gap_direction: Option<GapDirection>,
}

impl CalibrationCell {
    pub(crate) fn storage_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.run_id.0,
            self.predicted_bucket.label(),
            self.actual_bucket.label()
        )
    }
}

impl TenantOwned for CalibrationCell {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Parameters for triggering a calibration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationRequest {
    pub model_version: u32,
    #[serde(default)]
    pub period_start: Option<NaiveDate>,
    #[serde(default)]
    pub period_end: Option<NaiveDate>,
    #[serde(default)]
    pub run_label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CalibrationRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.model_version < 1 {
            return Err(ValidationError::OutOfRange {
                field: "model_version",
                min: 1,
                max: u32::MAX as i64,
                found: self.model_version as i64,
            });
        }
        if let (Some(start), Some(end)) = (self.period_start, self.period_end) {
            if end < start {
                return Err(ValidationError::InvertedPeriod {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Whether `date` falls inside the requested period; open bounds accept everything.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.period_start.map_or(true, |start| date >= start)
            && self.period_end.map_or(true, |end| date <= end)
    }
}

/// A predicted score paired with the observed outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSample {
    pub id: SampleId,
    pub tenant_id: TenantId,
    pub predicted_score: f64,
    pub actual_score: f64,
    pub observed_on: NaiveDate,
}

impl ValidationSample {
    pub fn new(
        tenant_id: TenantId,
        predicted_score: f64,
        actual_score: f64,
        observed_on: NaiveDate,
    ) -> Result<Self, ValidationError> {
        for (field, score) in [
            ("predicted_score", predicted_score),
            ("actual_score", actual_score),
        ] {
            if ScoreBucket::from_score(score).is_none() {
                return Err(ValidationError::Malformed(format!(
                    "{field} must be within 0..=100 (found {score})"
                )));
            }
        }
        Ok(Self {
            id: next_sample_id(),
            tenant_id,
            predicted_score,
            actual_score,
            observed_on,
        })
    }

    /// Predicted minus actual.
    pub fn signed_gap(&self) -> f64 {
        self.predicted_score - self.actual_score
    }
}

impl TenantOwned for ValidationSample {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Body of `POST /api/v1/calibration/samples`; the tenant comes from the request context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleInput {
    pub predicted_score: f64,
    pub actual_score: f64,
    pub observed_on: NaiveDate,
}

/// A run computed by the hosted pipeline, shipped together with its cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunImport {
    pub run: CalibrationRun,
    #[serde(default)]
    pub cells: Vec<CalibrationCell>,
}
