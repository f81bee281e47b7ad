//! Named, persisted list filters per page scope.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{GrcError, ValidationError};
use crate::store::TenantTable;
use crate::tenant::{TenantId, TenantOwned};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(pub String);

static VIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_view_id() -> ViewId {
    let id = VIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ViewId(format!("view-{id:06}"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedView {
    pub id: ViewId,
    pub tenant_id: TenantId,
    pub scope: String,
    pub name: String,
    pub filters: Map<String, Value>,
    pub is_default: bool,
}

impl TenantOwned for SavedView {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Saved views keyed by tenant and scope. At most one default per scope.
#[derive(Debug)]
pub struct SavedViewStore {
    rows: TenantTable<SavedView>,
}

impl Default for SavedViewStore {
    fn default() -> Self {
        Self {
            rows: TenantTable::new("saved_view"),
        }
    }
}

impl SavedViewStore {
    pub fn save(
        &self,
        tenant: &TenantId,
        scope: &str,
        name: &str,
        filters: Map<String, Value>,
        make_default: bool,
    ) -> Result<SavedView, GrcError> {
        let scope = scope.trim();
        let name = name.trim();
        if scope.is_empty() {
            return Err(ValidationError::Empty { field: "scope" }.into());
        }
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "name" }.into());
        }

        let view = SavedView {
            id: next_view_id(),
            tenant_id: tenant.clone(),
            scope: scope.to_string(),
            name: name.to_string(),
            filters,
            is_default: false,
        };
        let key = view.id.0.clone();
        let stored = self
            .rows
            .insert_unique(tenant, &key, view, |existing, candidate| {
                existing.scope == candidate.scope && existing.name.eq_ignore_ascii_case(&candidate.name)
            })?;
        info!(tenant = %tenant, scope, view_id = %stored.id.0, "saved view stored");

        if make_default {
            return self.set_default(tenant, &stored.id);
        }
        Ok(stored)
    }

    /// Views of one scope: the default first, then by name.
    pub fn list(&self, tenant: &TenantId, scope: &str) -> Result<Vec<SavedView>, GrcError> {
        let mut views: Vec<SavedView> = self
            .rows
            .list(tenant)?
            .into_iter()
            .filter(|view| view.scope == scope)
            .collect();
        views.sort_by(|left, right| {
            right
                .is_default
                .cmp(&left.is_default)
                .then_with(|| left.name.to_lowercase().cmp(&right.name.to_lowercase()))
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(views)
    }

    pub fn delete(&self, tenant: &TenantId, id: &ViewId) -> Result<SavedView, GrcError> {
        self.rows.remove(tenant, &id.0)
    }

    /// Makes `id` the scope default and clears the previous one in the same step.
    pub fn set_default(&self, tenant: &TenantId, id: &ViewId) -> Result<SavedView, GrcError> {
        let target = self
            .rows
            .get(tenant, &id.0)?
            .ok_or_else(|| GrcError::not_found("saved_view", id.0.clone()))?;

        let updated = self.rows.update_all(tenant, |key, view| {
            if view.scope == target.scope {
                view.is_default = key == id.0;
            }
            Ok(())
        })?;

        updated
            .into_iter()
            .find(|view| &view.id == id)
            .ok_or_else(|| GrcError::not_found("saved_view", id.0.clone()))
    }
}
