//! In-memory tenant-scoped tables.
//!
//! Rows are keyed by `(tenant, key)`, so each tenant has its own key space. Every write checks
//! that the row belongs to the caller, mirroring the row-level policies the hosted backend
//! enforces.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::GrcError;
use crate::tenant::{TenantId, TenantOwned};

#[derive(Debug)]
pub struct TenantTable<V> {
    resource: &'static str,
    rows: Mutex<BTreeMap<RowKey, V>>,
}

type RowKey = (TenantId, String);

fn row_key(tenant: &TenantId, key: &str) -> RowKey {
    (tenant.clone(), key.to_string())
}

impl<V> TenantTable<V>
where
    V: TenantOwned + Clone,
{
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            rows: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<RowKey, V>>, GrcError> {
        self.rows
            .lock()
            .map_err(|_| GrcError::remote(self.resource, "table lock poisoned"))
    }

    fn check_owner(caller: &TenantId, row: &V) -> Result<(), GrcError> {
        if row.tenant_id() != caller {
            return Err(GrcError::TenantMismatch {
                expected: caller.to_string(),
                found: row.tenant_id().to_string(),
            });
        }
        Ok(())
    }

    pub fn insert(&self, caller: &TenantId, key: &str, row: V) -> Result<V, GrcError> {
        self.insert_unique(caller, key, row, |_, _| false)
    }

    /// Inserts unless one of the caller's existing rows `clashes` with the candidate.
    pub fn insert_unique<F>(
        &self,
        caller: &TenantId,
        key: &str,
        row: V,
        clashes: F,
    ) -> Result<V, GrcError>
    where
        F: Fn(&V, &V) -> bool,
    {
        Self::check_owner(caller, &row)?;
        let mut rows = self.lock()?;
        let slot = row_key(caller, key);
        if rows.contains_key(&slot) {
            return Err(GrcError::Conflict {
                resource: self.resource,
                detail: format!("key '{key}' already exists"),
            });
        }
        if rows
            .values()
            .filter(|existing| existing.tenant_id() == caller)
            .any(|existing| clashes(existing, &row))
        {
            return Err(GrcError::Conflict {
                resource: self.resource,
                detail: "unique constraint violated".to_string(),
            });
        }
        rows.insert(slot, row.clone());
        Ok(row)
    }

    /// Fetches a row only when it belongs to `caller`; foreign rows look absent.
    pub fn get(&self, caller: &TenantId, key: &str) -> Result<Option<V>, GrcError> {
        let rows = self.lock()?;
        Ok(rows.get(&row_key(caller, key)).cloned())
    }

    /// Rows visible to `caller`, optionally narrowed by an explicit tenant filter.
    ///
    /// Filtering on another tenant yields an empty result instead of an error.
    pub fn select(
        &self,
        caller: &TenantId,
        tenant_filter: Option<&TenantId>,
    ) -> Result<Vec<V>, GrcError> {
        if tenant_filter.is_some_and(|filter| filter != caller) {
            return Ok(Vec::new());
        }
        let rows = self.lock()?;
        Ok(rows
            .iter()
            .filter(|((owner, _), _)| owner == caller)
            .map(|(_, row)| row.clone())
            .collect())
    }

    pub fn list(&self, caller: &TenantId) -> Result<Vec<V>, GrcError> {
        self.select(caller, None)
    }

    /// Applies `mutate` to a copy of the row and stores it only if the closure succeeds.
    pub fn modify<F>(&self, caller: &TenantId, key: &str, mutate: F) -> Result<V, GrcError>
    where
        F: FnOnce(&mut V) -> Result<(), GrcError>,
    {
        let mut rows = self.lock()?;
        let slot = row_key(caller, key);
        let current = rows
            .get(&slot)
            .ok_or_else(|| GrcError::not_found(self.resource, key))?;

        let mut updated = current.clone();
        mutate(&mut updated)?;
        Self::check_owner(caller, &updated)?;
        rows.insert(slot, updated.clone());
        Ok(updated)
    }

    /// Runs `mutate` over every row owned by `caller`; changes commit only if all succeed.
    pub fn update_all<F>(&self, caller: &TenantId, mut mutate: F) -> Result<Vec<V>, GrcError>
    where
        F: FnMut(&str, &mut V) -> Result<(), GrcError>,
    {
        let mut rows = self.lock()?;
        let mut staged = Vec::new();
        for ((owner, key), row) in rows.iter().filter(|((owner, _), _)| owner == caller) {
            let mut updated = row.clone();
            mutate(key, &mut updated)?;
            Self::check_owner(caller, &updated)?;
            staged.push(((owner.clone(), key.clone()), updated));
        }

        let committed = staged.iter().map(|(_, row)| row.clone()).collect();
        rows.extend(staged);
        Ok(committed)
    }

    pub fn remove(&self, caller: &TenantId, key: &str) -> Result<V, GrcError> {
        let mut rows = self.lock()?;
        rows.remove(&row_key(caller, key))
            .ok_or_else(|| GrcError::not_found(self.resource, key))
    }
}
