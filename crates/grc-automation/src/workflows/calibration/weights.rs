use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tenant::{TenantId, TenantOwned};

/// Tolerance used by `WeightSet::is_normalized`.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-6;
/// Changes smaller than this are reported as `no_change`.
pub const CHANGE_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightDimension {
    Engagement,
    Completion,
    FeedbackQuality,
    ComplianceLinkage,
}

impl WeightDimension {
    pub const fn ordered() -> [WeightDimension; 4] {
        [
            WeightDimension::Engagement,
            WeightDimension::Completion,
            WeightDimension::FeedbackQuality,
            WeightDimension::ComplianceLinkage,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            WeightDimension::Engagement => "Engagement",
            WeightDimension::Completion => "Completion",
            WeightDimension::FeedbackQuality => "Feedback Quality",
            WeightDimension::ComplianceLinkage => "Compliance Linkage",
        }
    }
}

/// Scoring weights; a well-formed set sums to 1.0 but nothing enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightSet {
    pub engagement: f64,
    pub completion: f64,
    pub feedback_quality: f64,
    pub compliance_linkage: f64,
}

impl WeightSet {
    pub fn get(&self, dimension: WeightDimension) -> f64 {
        match dimension {
            WeightDimension::Engagement => self.engagement,
            WeightDimension::Completion => self.completion,
            WeightDimension::FeedbackQuality => self.feedback_quality,
            WeightDimension::ComplianceLinkage => self.compliance_linkage,
        }
    }

    pub fn total(&self) -> f64 {
        WeightDimension::ordered()
            .into_iter()
            .map(|dimension| self.get(dimension))
            .sum()
    }

    pub fn is_normalized(&self) -> bool {
        (self.total() - 1.0).abs() <= NORMALIZATION_TOLERANCE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightPublication {
    pub version: u32,
    pub weights: WeightSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionDraft {
    pub source_weight_version: u32,
    pub suggested: WeightSet,
    #[serde(default)]
    pub rationale: Option<String>,
}

/// Published weight set keyed by version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVersion {
    pub tenant_id: TenantId,
    pub version: u32,
    pub weights: WeightSet,
    pub published_at: DateTime<Utc>,
}

impl TenantOwned for WeightVersion {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(pub String);

static SUGGESTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_suggestion_id() -> SuggestionId {
    let id = SUGGESTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SuggestionId(format!("suggestion-{id:06}"))
}

/// Proposed replacement for the weights published as `source_weight_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSuggestion {
    pub id: SuggestionId,
    pub tenant_id: TenantId,
    pub source_weight_version: u32,
    pub suggested: WeightSet,
    #[serde(default)]
    pub rationale: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for WeightSuggestion {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Increase,
    Decrease,
    NoChange,
}

impl ChangeKind {
    pub fn from_change(change: f64) -> Self {
        if change.abs() < CHANGE_EPSILON {
            ChangeKind::NoChange
        } else if change > 0.0 {
            ChangeKind::Increase
        } else {
            ChangeKind::Decrease
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightComparison {
    pub dimension: WeightDimension,
    pub label: String,
    pub current: f64,
    pub suggested: f64,
    pub change: f64,
    pub kind: ChangeKind,
}

/// Per-dimension diff of two weight sets, in dimension order.
pub fn compare_weights(current: &WeightSet, suggested: &WeightSet) -> [WeightComparison; 4] {
    WeightDimension::ordered().map(|dimension| {
        let before = current.get(dimension);
        let after = suggested.get(dimension);
        let change = after - before;
        WeightComparison {
            dimension,
            label: dimension.label().to_string(),
            current: before,
            suggested: after,
            change,
            kind: ChangeKind::from_change(change),
        }
    })
}

/// Comparison plus the totals callers show next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightComparisonReport {
    pub comparisons: Vec<WeightComparison>,
    pub current_total: f64,
    pub suggested_total: f64,
    pub current_normalized: bool,
    pub suggested_normalized: bool,
}

impl WeightComparisonReport {
    pub fn new(current: &WeightSet, suggested: &WeightSet) -> Self {
        Self {
            comparisons: compare_weights(current, suggested).to_vec(),
            current_total: current.total(),
            suggested_total: suggested.total(),
            current_normalized: current.is_normalized(),
            suggested_normalized: suggested.is_normalized(),
        }
    }
}
