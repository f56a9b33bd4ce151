//! Local projection of ledger-owned campaign state.
//!
//! The ledger is the single source of truth. A projection is always replaced
//! wholesale from a fresh read, never patched field by field, and a
//! projection marked stale stays stale until such a read completes.
//!
//! Each address carries a generation counter. `mark_stale` bumps it; a
//! refresh only installs its result if the generation it observed before
//! reading is still current, so a read that raced a state change can never
//! clear the stale marker.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use fundrelease_shared::types::{ActorAddress, CampaignAddress};

use crate::campaign::{Campaign, CampaignPolicy, CampaignType, Milestone};
use crate::clock::Clock;
use crate::ledger::{CampaignLedger, CampaignRecord};

use super::error::ReconcileError;

/// Default number of milestone records read per campaign.
pub const DEFAULT_MILESTONE_CAPACITY: usize = 10;

/// Default age after which a projection is dropped and re-read.
const DEFAULT_PROJECTION_TTL: Duration = Duration::from_secs(600);

/// Snapshot of one campaign as last read from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    /// Campaign state.
    pub campaign: Campaign,
    /// Identity allowed to withdraw.
    pub owner: ActorAddress,
    /// True once a state change was submitted and not yet re-read.
    pub stale: bool,
    /// When the ledger read completed.
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    projection: Option<Projection>,
}

/// Tuning for [`LedgerBalanceReconciler`].
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerSettings {
    /// Maximum milestone records read per campaign.
    pub milestone_capacity: usize,
    /// Age after which a projection is treated as unknown.
    pub projection_ttl: Duration,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            milestone_capacity: DEFAULT_MILESTONE_CAPACITY,
            projection_ttl: DEFAULT_PROJECTION_TTL,
        }
    }
}

/// Keeps per-campaign projections in step with the external ledger.
pub struct LedgerBalanceReconciler {
    ledger: Arc<dyn CampaignLedger>,
    clock: Arc<dyn Clock>,
    settings: ReconcilerSettings,
    slots: DashMap<CampaignAddress, Slot>,
}

impl LedgerBalanceReconciler {
    /// Creates a reconciler over `ledger`.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn CampaignLedger>,
        clock: Arc<dyn Clock>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            ledger,
            clock,
            settings,
            slots: DashMap::new(),
        }
    }

    /// Re-reads the campaign from the ledger and replaces its projection.
    ///
    /// On failure the previous projection, and its stale flag, are left as
    /// they were.
    ///
    /// # Errors
    ///
    /// - `LedgerUnreachable` / `CampaignNotFound` from the ledger read
    /// - `InconsistentLedger` if the ledger data breaks campaign invariants
    /// - `Superseded` if the campaign was marked stale during the read
    pub async fn refresh(&self, address: &CampaignAddress) -> Result<Projection, ReconcileError> {
        let observed = self.generation(address);

        let (campaign, owner) = self.read(address).await.inspect_err(|e| {
            warn!(campaign = %address, error = %e, "Campaign refresh failed");
        })?;

        let mut slot = self.slots.entry(address.clone()).or_default();
        if slot.generation != observed {
            warn!(
                campaign = %address,
                observed,
                current = slot.generation,
                "Discarding refresh that raced a state change"
            );
            return Err(ReconcileError::Superseded(address.clone()));
        }

        let projection = Projection {
            campaign,
            owner,
            stale: false,
            fetched_at: self.clock.now(),
        };
        slot.projection = Some(projection.clone());
        drop(slot);

        info!(
            campaign = %address,
            campaign_type = %projection.campaign.campaign_type(),
            balance = %projection.campaign.ledger_balance,
            "Campaign projection refreshed"
        );
        Ok(projection)
    }

    /// Marks the campaign's projection stale until the next successful refresh.
    pub fn mark_stale(&self, address: &CampaignAddress) {
        let mut slot = self.slots.entry(address.clone()).or_default();
        slot.generation += 1;
        if let Some(projection) = slot.projection.as_mut() {
            projection.stale = true;
        }
        debug!(campaign = %address, generation = slot.generation, "Projection marked stale");
    }

    /// Returns the current projection, stale or not.
    ///
    /// Returns `None` if the campaign was never read or its projection aged
    /// past the configured TTL (the expired projection is dropped).
    pub fn projection(&self, address: &CampaignAddress) -> Option<Projection> {
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(self.settings.projection_ttl).ok();

        let mut slot = self.slots.get_mut(address)?;
        let expired = match (&slot.projection, ttl) {
            (Some(p), Some(ttl)) => !p.stale && now - p.fetched_at >= ttl,
            _ => false,
        };
        if expired {
            debug!(campaign = %address, "Projection expired");
            slot.projection = None;
            return None;
        }
        slot.projection.clone()
    }

    /// Returns true if the campaign has a projection that awaits a re-read.
    pub fn is_stale(&self, address: &CampaignAddress) -> bool {
        self.slots
            .get(address)
            .and_then(|slot| slot.projection.as_ref().map(|p| p.stale))
            .unwrap_or(false)
    }

    fn generation(&self, address: &CampaignAddress) -> u64 {
        self.slots.get(address).map_or(0, |slot| slot.generation)
    }

    async fn read(
        &self,
        address: &CampaignAddress,
    ) -> Result<(Campaign, ActorAddress), ReconcileError> {
        let record = self.ledger.read_campaign(address).await?;
        let campaign_type = CampaignType::from_code(record.campaign_type).ok_or_else(|| {
            ReconcileError::InconsistentLedger(format!(
                "unknown campaign type {}",
                record.campaign_type
            ))
        })?;

        let policy = match campaign_type {
            CampaignType::Flexible => CampaignPolicy::Flexible,
            CampaignType::Milestone => {
                let milestones = self
                    .ledger
                    .read_milestones(address, self.settings.milestone_capacity)
                    .await?;
                self.check_milestones(&record, &milestones)?;
                CampaignPolicy::Milestone { milestones }
            }
            CampaignType::Recurring => CampaignPolicy::Recurring {
                cap: record.cap,
                period_secs: record.period_secs,
                last_withdraw_time: record.last_withdraw_time,
            },
            CampaignType::AllOrNothing => CampaignPolicy::AllOrNothing {
                deadline: record.deadline,
                claimed: record.claimed,
            },
        };

        if record.balance.is_sign_negative() || record.total_donated.is_sign_negative() {
            return Err(ReconcileError::InconsistentLedger(
                "negative balance or donation total".into(),
            ));
        }

        let campaign = Campaign {
            address: record.address,
            goal_amount: record.goal_amount,
            total_donated: record.total_donated,
            ledger_balance: record.balance,
            policy,
        };
        Ok((campaign, record.owner))
    }

    /// A milestone batch must fit the capacity, match the advertised count,
    /// use contiguous indexes from zero, and have released flags forming a
    /// prefix.
    fn check_milestones(
        &self,
        record: &CampaignRecord,
        milestones: &[Milestone],
    ) -> Result<(), ReconcileError> {
        let capacity = self.settings.milestone_capacity;
        if record.milestone_count > capacity || milestones.len() > capacity {
            return Err(ReconcileError::InconsistentLedger(format!(
                "{} milestones exceed capacity {capacity}",
                record.milestone_count.max(milestones.len())
            )));
        }
        let expected = record.milestone_count;
        if milestones.len() != expected {
            return Err(ReconcileError::InconsistentLedger(format!(
                "expected {expected} milestones, ledger returned {}",
                milestones.len()
            )));
        }
        if let Some((pos, m)) = milestones.iter().enumerate().find(|(pos, m)| m.index != *pos) {
            return Err(ReconcileError::InconsistentLedger(format!(
                "milestone at position {pos} has index {}",
                m.index
            )));
        }
        if milestones
            .windows(2)
            .any(|pair| !pair[0].released && pair[1].released)
        {
            return Err(ReconcileError::InconsistentLedger(
                "milestones released out of order".into(),
            ));
        }
        Ok(())
    }
}
