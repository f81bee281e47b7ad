use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::content::percentage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Open,
    InProgress,
    Completed,
    Overdue,
}

impl ActionStatus {
    pub const fn ordered() -> [ActionStatus; 4] {
        [
            ActionStatus::Open,
            ActionStatus::InProgress,
            ActionStatus::Completed,
            ActionStatus::Overdue,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            ActionStatus::Open => "Open",
            ActionStatus::InProgress => "In Progress",
            ActionStatus::Completed => "Completed",
            ActionStatus::Overdue => "Overdue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl ActionPriority {
    pub const fn ordered() -> [ActionPriority; 4] {
        [
            ActionPriority::Critical,
            ActionPriority::High,
            ActionPriority::Medium,
            ActionPriority::Low,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            ActionPriority::Low => "Low",
            ActionPriority::Medium => "Medium",
            ActionPriority::High => "High",
            ActionPriority::Critical => "Critical",
        }
    }
}

/// Follow-up item raised by an assessment or audit finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationAction {
    pub id: String,
    pub title: String,
    pub status: ActionStatus,
    pub priority: ActionPriority,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub due_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: ActionStatus,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCount {
    pub priority: ActionPriority,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionsReport {
    pub total: usize,
    pub by_status: Vec<StatusCount>,
    pub by_priority: Vec<PriorityCount>,
    pub completion_percentage: f64,
    pub unassigned: usize,
    pub open_critical: Vec<RemediationAction>,
}

/// Status and priority breakdown; every status and priority appears even with a zero count.
pub fn build_actions_report(actions: &[RemediationAction]) -> ActionsReport {
    let by_status = ActionStatus::ordered()
        .into_iter()
        .map(|status| StatusCount {
            status,
            label: status.label().to_string(),
            count: actions.iter().filter(|action| action.status == status).count(),
        })
        .collect();

    let by_priority = ActionPriority::ordered()
        .into_iter()
        .map(|priority| PriorityCount {
            priority,
            label: priority.label().to_string(),
            count: actions
                .iter()
                .filter(|action| action.priority == priority)
                .count(),
        })
        .collect();

    let completed = actions
        .iter()
        .filter(|action| action.status == ActionStatus::Completed)
        .count();

    let open_critical = actions
        .iter()
        .filter(|action| {
            action.priority == ActionPriority::Critical && action.status != ActionStatus::Completed
        })
        .cloned()
        .collect();

    ActionsReport {
        total: actions.len(),
        by_status,
        by_priority,
        completion_percentage: percentage(completed as u64, actions.len() as u64),
        unassigned: actions
            .iter()
            .filter(|action| {
                action
                    .owner
                    .as_deref()
                    .map_or(true, |owner| owner.trim().is_empty())
            })
            .count(),
        open_critical,
    }
}
