use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    Complete,
    Share,
    Like,
}

/// One learner interaction with a content-hub item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentInteraction {
    pub content_id: String,
    pub title: String,
    pub category: String,
    pub content_type: String,
    pub interaction: InteractionKind,
    pub occurred_on: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCounts {
    pub views: u64,
    pub completions: u64,
    pub shares: u64,
    pub likes: u64,
}

impl InteractionCounts {
    fn record(&mut self, kind: InteractionKind) {
        match kind {
            InteractionKind::View => self.views += 1,
            InteractionKind::Complete => self.completions += 1,
            InteractionKind::Share => self.shares += 1,
            InteractionKind::Like => self.likes += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.views + self.completions + self.shares + self.likes
    }

    pub fn completion_rate(&self) -> f64 {
        percentage(self.completions, self.views)
    }
}

/// `part / whole * 100`, treating an empty whole as 1 so the result stays finite.
pub fn percentage(part: u64, whole: u64) -> f64 {
    part as f64 / whole.max(1) as f64 * 100.0
}

/// Per-item performance row, the unit of the content export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPerformance {
    pub content_id: String,
    pub title: String,
    pub category: String,
    pub content_type: String,
    pub views: u64,
    pub completions: u64,
    pub shares: u64,
    pub likes: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentAnalytics {
    pub totals: InteractionCounts,
    pub by_date: BTreeMap<NaiveDate, InteractionCounts>,
    pub by_category: BTreeMap<String, InteractionCounts>,
    pub by_content_type: BTreeMap<String, InteractionCounts>,
    pub content: Vec<ContentPerformance>,
}

/// Groups interactions by date, category, content type, and item.
///
/// Item rows are ordered by views (descending), then content id.
pub fn summarize_content(interactions: &[ContentInteraction]) -> ContentAnalytics {
    let mut analytics = ContentAnalytics::default();
    let mut items: HashMap<&str, (&ContentInteraction, InteractionCounts)> = HashMap::new();

    for interaction in interactions {
        let kind = interaction.interaction;
        analytics.totals.record(kind);
        analytics
            .by_date
            .entry(interaction.occurred_on)
            .or_default()
            .record(kind);
        analytics
            .by_category
            .entry(interaction.category.clone())
            .or_default()
            .record(kind);
        analytics
            .by_content_type
            .entry(interaction.content_type.clone())
            .or_default()
            .record(kind);
        items
            .entry(interaction.content_id.as_str())
            .or_insert_with(|| (interaction, InteractionCounts::default()))
            .1
            .record(kind);
    }

    let mut content: Vec<ContentPerformance> = items
        .into_values()
        .map(|(first_seen, counts)| ContentPerformance {
            content_id: first_seen.content_id.clone(),
            title: first_seen.title.clone(),
            category: first_seen.category.clone(),
            content_type: first_seen.content_type.clone(),
            views: counts.views,
            completions: counts.completions,
            shares: counts.shares,
            likes: counts.likes,
            completion_rate: counts.completion_rate(),
        })
        .collect();
    content.sort_by(|left, right| {
        right
            .views
            .cmp(&left.views)
            .then_with(|| left.content_id.cmp(&right.content_id))
    });
    analytics.content = content;
    analytics
}
