//! Explicit tenant and capability context threaded through every operation.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GrcError, ValidationError};

/// Identifier of an isolated customer organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "tenant_id" });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application scope a rule may be restricted to (e.g. `policy_hub`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppCode(pub String);

impl AppCode {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl fmt::Display for AppCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability flags gating administrative surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    RulesRead,
    RulesWrite,
    RulesExecute,
    CalibrationRead,
    CalibrationRun,
    AnalyticsExport,
}

impl Capability {
    pub const fn label(self) -> &'static str {
        match self {
            Capability::RulesRead => "rules:read",
            Capability::RulesWrite => "rules:write",
            Capability::RulesExecute => "rules:execute",
            Capability::CalibrationRead => "calibration:read",
            Capability::CalibrationRun => "calibration:run",
            Capability::AnalyticsExport => "analytics:export",
        }
    }

    pub fn all() -> [Capability; 6] {
        [
            Capability::RulesRead,
            Capability::RulesWrite,
            Capability::RulesExecute,
            Capability::CalibrationRead,
            Capability::CalibrationRun,
            Capability::AnalyticsExport,
        ]
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim();
        Self::all()
            .into_iter()
            .find(|capability| capability.label().eq_ignore_ascii_case(wanted))
    }
}

/// Caller identity as seen by services: the active tenant (if any) plus granted capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessContext {
    tenant: Option<TenantId>,
    capabilities: BTreeSet<Capability>,
}

impl AccessContext {
    pub fn new(
        tenant: Option<TenantId>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            tenant,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    /// Context holding every capability for the given tenant.
    pub fn administrator(tenant: TenantId) -> Self {
        Self::new(Some(tenant), Capability::all())
    }

    /// Parses a comma separated capability list; unknown entries are ignored.
    pub fn from_capability_list(tenant: Option<TenantId>, raw: &str) -> Self {
        Self::new(tenant, raw.split(',').filter_map(Capability::parse))
    }

    pub fn tenant(&self) -> Result<&TenantId, GrcError> {
        self.tenant.as_ref().ok_or(GrcError::TenantContextMissing)
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Resolves the tenant first so a missing tenant is never reported as a permission issue.
    pub fn require(&self, capability: Capability) -> Result<&TenantId, GrcError> {
        let tenant = self.tenant()?;
        if !self.has(capability) {
            return Err(GrcError::PermissionDenied {
                capability: capability.label().to_string(),
            });
        }
        Ok(tenant)
    }
}

/// Rows that carry an owning tenant.
pub trait TenantOwned {
    fn tenant_id(&self) -> &TenantId;
}
