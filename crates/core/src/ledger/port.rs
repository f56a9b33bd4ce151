//! Port to the external ledger that owns campaign state.
//!
//! The ledger is authoritative for balances, totals, milestone flags and
//! timestamps. Everything here is read or written remotely; nothing is
//! assumed to be cached.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fundrelease_shared::types::{ActorAddress, CampaignAddress};

use crate::campaign::Milestone;

use super::error::LedgerError;

/// Scalar campaign state as the ledger exposes it.
///
/// Fields that do not apply to the campaign's type are left at their zero
/// values, the way the ledger reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRecord {
    /// Ledger identifier of the pool.
    pub address: CampaignAddress,
    /// Only identity allowed to withdraw.
    pub owner: ActorAddress,
    /// Numeric campaign type (0 flexible, 1 milestone, 2 recurring, 3 all-or-nothing).
    pub campaign_type: u8,
    /// Fundraising goal.
    pub goal_amount: Decimal,
    /// Everything ever donated.
    pub total_donated: Decimal,
    /// What the pool holds right now.
    pub balance: Decimal,
    /// Number of milestone records.
    pub milestone_count: usize,
    /// Recurring cap per period.
    pub cap: Decimal,
    /// Recurring period in seconds.
    pub period_secs: u64,
    /// Time of the last recurring withdrawal.
    pub last_withdraw_time: DateTime<Utc>,
    /// All-or-nothing deadline.
    pub deadline: DateTime<Utc>,
    /// All-or-nothing claimed flag.
    pub claimed: bool,
}

/// A state-changing call against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReleaseCall {
    /// Flexible `withdraw(amount)`.
    Withdraw {
        /// Native amount.
        amount: Decimal,
    },
    /// Milestone `releaseMilestone(index)`.
    ReleaseMilestone {
        /// Milestone index.
        index: usize,
    },
    /// Recurring `withdraw(amount)`.
    RecurringWithdraw {
        /// Native amount.
        amount: Decimal,
    },
    /// All-or-nothing `claimFunds()`.
    ClaimFunds,
}

/// Proof that the ledger applied a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Ledger transaction identifier.
    pub tx_hash: String,
    /// Native amount that left the pool.
    pub released_amount: Decimal,
    /// When the ledger confirmed the change.
    pub confirmed_at: DateTime<Utc>,
}

/// Read and write access to the external campaign ledger.
#[async_trait]
pub trait CampaignLedger: Send + Sync {
    /// Reads the scalar state of one campaign.
    async fn read_campaign(&self, address: &CampaignAddress) -> Result<CampaignRecord, LedgerError>;

    /// Reads up to `capacity` milestone records, in index order.
    async fn read_milestones(
        &self,
        address: &CampaignAddress,
        capacity: usize,
    ) -> Result<Vec<Milestone>, LedgerError>;

    /// Submits a release as `actor` and waits for confirmation.
    async fn submit_release(
        &self,
        address: &CampaignAddress,
        actor: &ActorAddress,
        call: ReleaseCall,
    ) -> Result<Receipt, LedgerError>;
}
