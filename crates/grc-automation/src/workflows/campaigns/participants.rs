use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{GrcError, ValidationError};
use crate::store::TenantTable;
use crate::tenant::{TenantId, TenantOwned};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

static PARTICIPANT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_participant_id() -> ParticipantId {
    let id = PARTICIPANT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ParticipantId(format!("participant-{id:06}"))
}

/// Employee enrolled in an awareness campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignParticipant {
    pub id: ParticipantId,
    pub tenant_id: TenantId,
    pub campaign_id: String,
    pub employee_ref: String,
    pub enrolled_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CampaignParticipant {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    fn same_enrolment(&self, other: &CampaignParticipant) -> bool {
        self.campaign_id == other.campaign_id && self.employee_ref == other.employee_ref
    }
}

impl TenantOwned for CampaignParticipant {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Participant registry; an employee holds at most one active enrolment per campaign.
#[derive(Debug)]
pub struct ParticipantRegistry {
    rows: TenantTable<CampaignParticipant>,
}

impl Default for ParticipantRegistry {
    fn default() -> Self {
        Self {
            rows: TenantTable::new("campaign_participant"),
        }
    }
}

impl ParticipantRegistry {
    pub fn enroll(
        &self,
        tenant: &TenantId,
        campaign_id: &str,
        employee_ref: &str,
    ) -> Result<CampaignParticipant, GrcError> {
        let campaign_id = campaign_id.trim();
        let employee_ref = employee_ref.trim();
        if campaign_id.is_empty() {
            return Err(ValidationError::Empty {
                field: "campaign_id",
            }
            .into());
        }
        if employee_ref.is_empty() {
            return Err(ValidationError::Empty {
                field: "employee_ref",
            }
            .into());
        }

        let participant = CampaignParticipant {
            id: next_participant_id(),
            tenant_id: tenant.clone(),
            campaign_id: campaign_id.to_string(),
            employee_ref: employee_ref.to_string(),
            enrolled_at: Utc::now(),
            deleted_at: None,
        };
        let key = participant.id.0.clone();
        let stored = self
            .rows
            .insert_unique(tenant, &key, participant, |existing, candidate| {
                existing.is_active() && existing.same_enrolment(candidate)
            })?;

        info!(tenant = %tenant, campaign_id, participant_id = %stored.id.0, "participant enrolled");
        Ok(stored)
    }

    /// Marks the row deleted; the employee may enrol again afterwards.
    pub fn soft_delete(
        &self,
        tenant: &TenantId,
        participant_id: &ParticipantId,
    ) -> Result<CampaignParticipant, GrcError> {
        self.rows.modify(tenant, &participant_id.0, |participant| {
            if participant.deleted_at.is_some() {
                return Err(GrcError::Conflict {
                    resource: "campaign_participant",
                    detail: format!("participant '{}' already removed", participant.id.0),
                });
            }
            participant.deleted_at = Some(Utc::now());
            Ok(())
        })
    }

    /// Active participants of a campaign, oldest enrolment first.
    pub fn list(
        &self,
        tenant: &TenantId,
        campaign_id: &str,
    ) -> Result<Vec<CampaignParticipant>, GrcError> {
        let mut participants: Vec<CampaignParticipant> = self
            .rows
            .list(tenant)?
            .into_iter()
            .filter(|participant| participant.is_active() && participant.campaign_id == campaign_id)
            .collect();
        participants.sort_by(|left, right| {
            left.enrolled_at
                .cmp(&right.enrolled_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(participants)
    }

    /// Every row visible to `caller`, optionally narrowed to an explicit tenant.
    pub fn select(
        &self,
        caller: &TenantId,
        tenant_filter: Option<&TenantId>,
    ) -> Result<Vec<CampaignParticipant>, GrcError> {
        self.rows.select(caller, tenant_filter)
    }

    /// Writes a fully-formed row, e.g. during a restore. Rows of another tenant are rejected.
    pub fn restore(
        &self,
        caller: &TenantId,
        participant: CampaignParticipant,
    ) -> Result<CampaignParticipant, GrcError> {
        let key = participant.id.0.clone();
        self.rows
            .insert_unique(caller, &key, participant, |existing, candidate| {
                candidate.is_active() && existing.is_active() && existing.same_enrolment(candidate)
            })
    }
}
