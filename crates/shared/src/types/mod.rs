//! Common types used across the application.

pub mod id;
pub mod money;

pub use id::{ActorAddress, AddressError, CampaignAddress};
pub use money::{Currency, Money};
