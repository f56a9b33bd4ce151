//! External ledger access.
//!
//! - `port` - The `CampaignLedger` trait and the records it exchanges
//! - `memory` - In-process ledger with contract-equivalent rules
//! - `error` - Ledger error types

pub mod error;
pub mod memory;
pub mod port;

pub use error::LedgerError;
pub use memory::{CampaignTerms, InMemoryLedger, MilestoneTerms, NewCampaign, WriteFault};
pub use port::{CampaignLedger, CampaignRecord, Receipt, ReleaseCall};
