//! Security-awareness campaign enrolment.

pub mod participants;

pub use participants::{CampaignParticipant, ParticipantId, ParticipantRegistry};
