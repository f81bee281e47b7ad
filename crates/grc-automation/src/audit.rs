use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GrcError;
use crate::tenant::TenantId;

/// Append-only audit record emitted for administrative mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub tenant_id: TenantId,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub metadata: BTreeMap<String, String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        tenant_id: TenantId,
        action: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            metadata: BTreeMap::new(),
            recorded_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Outbound hook for the audit collaborator.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), GrcError>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn entries_for(&self, tenant: &TenantId) -> Vec<AuditEntry> {
        match self.entries.lock() {
            Ok(entries) => entries
                .iter()
                .filter(|entry| &entry.tenant_id == tenant)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, entry: AuditEntry) -> Result<(), GrcError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| GrcError::remote("write audit log", "audit log lock poisoned"))?;
        entries.push(entry);
        Ok(())
    }
}
