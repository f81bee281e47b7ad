use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::domain::{Document, DocumentId, DocumentStatus};

/// Side effect a matched rule performs on the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleAction {
    Approve {
        #[serde(default)]
        approver: Option<String>,
    },
    AddTags {
        tags: Vec<String>,
    },
    RemoveTags {
        tags: Vec<String>,
    },
    Notify {
        channel: String,
        message: String,
    },
    ExpirationAlert {
        days_before: i64,
    },
    VersionAlert {
        min_version: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Notification,
    Expiration,
    Version,
}

/// Alert raised while applying actions; delivery is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAlert {
    pub document_id: DocumentId,
    pub kind: AlertKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("cannot {action} archived document '{}'", .document.0)]
    ArchivedDocument {
        action: &'static str,
        document: DocumentId,
    },
    #[error("tag values must not be blank")]
    BlankTag,
    #[error("notification channel must not be blank")]
    BlankChannel,
}

/// Result of applying an action list to a working copy of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub document: Document,
    pub performed: Vec<Value>,
    pub alerts: Vec<DocumentAlert>,
}

/// Applies `actions` in order to a copy of `document`.
///
/// The first failing action aborts the whole list; the caller's document is never touched.
pub fn apply_actions(
    actions: &[RuleAction],
    document: &Document,
    today: NaiveDate,
) -> Result<ActionOutcome, ActionError> {
    let mut working = document.clone();
    let mut performed = Vec::with_capacity(actions.len());
    let mut alerts = Vec::new();

    for action in actions {
        match action {
            RuleAction::Approve { approver } => {
                if working.status == DocumentStatus::Archived {
                    return Err(ActionError::ArchivedDocument {
                        action: "approve",
                        document: working.id.clone(),
                    });
                }
                let previous = working.status;
                working.status = DocumentStatus::Approved;
                performed.push(json!({
                    "action": "approve",
                    "previous_status": previous.label(),
                    "approver": approver,
                }));
            }
            RuleAction::AddTags { tags } => {
                let mut added = Vec::new();
                for tag in tags {
                    let tag = tag.trim();
                    if tag.is_empty() {
                        return Err(ActionError::BlankTag);
                    }
                    if working.tags.insert(tag.to_string()) {
                        added.push(tag.to_string());
                    }
                }
                performed.push(json!({ "action": "add_tags", "added": added }));
            }
            RuleAction::RemoveTags { tags } => {
                let mut removed = Vec::new();
                for tag in tags {
                    if working.tags.remove(tag.trim()) {
                        removed.push(tag.trim().to_string());
                    }
                }
                performed.push(json!({ "action": "remove_tags", "removed": removed }));
            }
            RuleAction::Notify { channel, message } => {
                if channel.trim().is_empty() {
                    return Err(ActionError::BlankChannel);
                }
                alerts.push(DocumentAlert {
                    document_id: working.id.clone(),
                    kind: AlertKind::Notification,
                    channel: Some(channel.clone()),
                    message: message.clone(),
                });
                performed.push(json!({ "action": "notify", "channel": channel }));
            }
            RuleAction::ExpirationAlert { days_before } => {
                let remaining = working.days_until_expiry(today);
                let alerted = match remaining {
                    Some(days) if days <= *days_before => {
                        alerts.push(DocumentAlert {
                            document_id: working.id.clone(),
                            kind: AlertKind::Expiration,
                            channel: None,
                            message: expiry_message(&working.title, days),
                        });
                        true
                    }
                    _ => false,
                };
                performed.push(json!({
                    "action": "expiration_alert",
                    "days_until_expiry": remaining,
                    "alerted": alerted,
                }));
            }
            RuleAction::VersionAlert { min_version } => {
                let alerted = working.version >= *min_version;
                if alerted {
                    alerts.push(DocumentAlert {
                        document_id: working.id.clone(),
                        kind: AlertKind::Version,
                        channel: None,
                        message: format!(
                            "'{}' reached version {} (threshold {})",
                            working.title, working.version, min_version
                        ),
                    });
                }
                performed.push(json!({
                    "action": "version_alert",
                    "version": working.version,
                    "alerted": alerted,
                }));
            }
        }
    }

    Ok(ActionOutcome {
        document: working,
        performed,
        alerts,
    })
}

pub(crate) fn expiry_message(title: &str, days_until_expiry: i64) -> String {
    match days_until_expiry {
        days if days < 0 => format!("'{title}' expired {} day(s) ago", -days),
        0 => format!("'{title}' expires today"),
        days => format!("'{title}' expires in {days} day(s)"),
    }
}
