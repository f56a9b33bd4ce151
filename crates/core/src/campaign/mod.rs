//! Campaign projection types.

pub mod types;

pub use types::{Campaign, CampaignPolicy, CampaignType, Milestone, next_eligible_after};
