//! Content-hub analytics, remediation action reporting, and CSV export.

pub mod actions_report;
pub mod content;
pub mod export;
pub mod router;

pub use actions_report::{
    build_actions_report, ActionPriority, ActionStatus, ActionsReport, RemediationAction,
};
pub use content::{
    percentage, summarize_content, ContentAnalytics, ContentInteraction, ContentPerformance,
    InteractionCounts, InteractionKind,
};
pub use export::{to_csv_string, write_csv, CsvRecord};
pub use router::analytics_router;
