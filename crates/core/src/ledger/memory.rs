//! In-process ledger used for development and tests.
//!
//! Enforces the same invariants the on-chain campaign contracts do, so the
//! engine can be exercised end to end without a network. Latency and faults
//! can be injected to drive timeout and failure paths.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use fundrelease_shared::types::{ActorAddress, CampaignAddress};

use crate::campaign::{CampaignType, Milestone, next_eligible_after};
use crate::clock::Clock;

use super::error::LedgerError;
use super::port::{CampaignLedger, CampaignRecord, ReleaseCall, Receipt};

/// Milestone definition for a new campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneTerms {
    /// Short name.
    pub name: String,
    /// What the tranche pays for.
    #[serde(default)]
    pub description: String,
    /// Native amount of the tranche.
    pub amount: Decimal,
}

/// Policy-specific terms for a new campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CampaignTerms {
    /// Withdraw any amount any time.
    Flexible,
    /// Ordered tranches.
    Milestone {
        /// Tranches in release order.
        milestones: Vec<MilestoneTerms>,
    },
    /// Capped withdrawal once per period.
    Recurring {
        /// Per-period cap.
        cap: Decimal,
        /// Period in seconds.
        period_secs: u64,
    },
    /// Single claim after the deadline.
    AllOrNothing {
        /// Earliest claim time.
        deadline: DateTime<Utc>,
    },
}

/// A campaign to open on the in-memory ledger. Also the seed file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCampaign {
    /// Pool address.
    pub address: CampaignAddress,
    /// Withdrawing identity.
    pub owner: ActorAddress,
    /// Fundraising goal.
    pub goal_amount: Decimal,
    /// Donations present at creation.
    #[serde(default)]
    pub donated: Decimal,
    /// Policy terms.
    #[serde(flatten)]
    pub terms: CampaignTerms,
}

/// Fault to apply to the next release call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteFault {
    /// Refuse the call with this reason.
    Reject(String),
    /// Never answer.
    Stall,
}

#[derive(Debug, Default)]
struct FaultPlan {
    unreachable: bool,
    next_write: Option<WriteFault>,
}

#[derive(Debug, Clone)]
struct Pool {
    record: CampaignRecord,
    milestones: Vec<Milestone>,
}

/// Ledger held in memory behind an async mutex.
pub struct InMemoryLedger {
    pools: Mutex<HashMap<CampaignAddress, Pool>>,
    faults: Mutex<FaultPlan>,
    clock: Arc<dyn Clock>,
    latency: Duration,
    tx_counter: AtomicU64,
    write_calls: AtomicU64,
}

impl InMemoryLedger {
    /// Creates an empty ledger reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
            faults: Mutex::new(FaultPlan::default()),
            clock,
            latency: Duration::ZERO,
            tx_counter: AtomicU64::new(0),
            write_calls: AtomicU64::new(0),
        }
    }

    /// Delays every call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Opens a campaign.
    ///
    /// # Errors
    ///
    /// `Rejected` if the address is taken or the terms are invalid.
    pub async fn open(&self, campaign: NewCampaign) -> Result<(), LedgerError> {
        if campaign.goal_amount < Decimal::ZERO || campaign.donated < Decimal::ZERO {
            return Err(LedgerError::Rejected("amounts must not be negative".into()));
        }

        let epoch = DateTime::<Utc>::default();
        let mut record = CampaignRecord {
            address: campaign.address.clone(),
            owner: campaign.owner,
            campaign_type: 0,
            goal_amount: campaign.goal_amount,
            total_donated: campaign.donated,
            balance: campaign.donated,
            milestone_count: 0,
            cap: Decimal::ZERO,
            period_secs: 0,
            last_withdraw_time: epoch,
            deadline: epoch,
            claimed: false,
        };
        let mut milestones = Vec::new();

        match campaign.terms {
            CampaignTerms::Flexible => {
                record.campaign_type = CampaignType::Flexible.code();
            }
            CampaignTerms::Milestone { milestones: terms } => {
                if terms.iter().any(|m| m.amount <= Decimal::ZERO) {
                    return Err(LedgerError::Rejected(
                        "milestone amounts must be positive".into(),
                    ));
                }
                record.campaign_type = CampaignType::Milestone.code();
                record.milestone_count = terms.len();
                milestones = terms
                    .into_iter()
                    .enumerate()
                    .map(|(index, m)| Milestone {
                        index,
                        name: m.name,
                        description: m.description,
                        amount: m.amount,
                        released: false,
                    })
                    .collect();
            }
            CampaignTerms::Recurring { cap, period_secs } => {
                if cap <= Decimal::ZERO {
                    return Err(LedgerError::Rejected("cap must be positive".into()));
                }
                record.campaign_type = CampaignType::Recurring.code();
                record.cap = cap;
                record.period_secs = period_secs;
            }
            CampaignTerms::AllOrNothing { deadline } => {
                record.campaign_type = CampaignType::AllOrNothing.code();
                record.deadline = deadline;
            }
        }

        let mut pools = self.pools.lock().await;
        if pools.contains_key(&campaign.address) {
            return Err(LedgerError::Rejected(format!(
                "campaign {} already exists",
                campaign.address
            )));
        }
        pools.insert(campaign.address, Pool { record, milestones });
        Ok(())
    }

    /// Adds a donation to a campaign.
    ///
    /// # Errors
    ///
    /// `CampaignNotFound` for unknown addresses, `Rejected` for non-positive amounts.
    pub async fn donate(&self, address: &CampaignAddress, amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::Rejected("donation must be positive".into()));
        }
        let mut pools = self.pools.lock().await;
        let pool = pools
            .get_mut(address)
            .ok_or_else(|| LedgerError::CampaignNotFound(address.clone()))?;
        pool.record.total_donated += amount;
        pool.record.balance += amount;
        debug!(campaign = %address, amount = %amount, "Donation recorded");
        Ok(())
    }

    /// Makes every call fail with `Unreachable` until cleared.
    pub async fn set_unreachable(&self, unreachable: bool) {
        self.faults.lock().await.unreachable = unreachable;
    }

    /// Applies `fault` to the next release call only.
    pub async fn fail_next_write(&self, fault: WriteFault) {
        self.faults.lock().await.next_write = Some(fault);
    }

    /// Number of release calls received, including failed ones.
    #[must_use]
    pub fn write_calls(&self) -> u64 {
        self.write_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    async fn check_reachable(&self) -> Result<(), LedgerError> {
        if self.faults.lock().await.unreachable {
            return Err(LedgerError::Unreachable("ledger node not responding".into()));
        }
        Ok(())
    }

    fn next_tx_hash(&self) -> String {
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("0x{n:064x}")
    }

    fn apply(pool: &mut Pool, actor: &ActorAddress, call: ReleaseCall, now: DateTime<Utc>) -> Result<Decimal, String> {
        let record = &mut pool.record;
        if *actor != record.owner {
            return Err("caller is not the campaign owner".into());
        }

        let kind = CampaignType::from_code(record.campaign_type)
            .ok_or_else(|| format!("unknown campaign type {}", record.campaign_type))?;

        match (kind, call) {
            (CampaignType::Flexible, ReleaseCall::Withdraw { amount }) => {
                if amount <= Decimal::ZERO {
                    return Err("amount must be positive".into());
                }
                if amount > record.balance {
                    return Err("insufficient balance".into());
                }
                record.balance -= amount;
                Ok(amount)
            }
            (CampaignType::Milestone, ReleaseCall::ReleaseMilestone { index }) => {
                let next = pool
                    .milestones
                    .iter()
                    .position(|m| !m.released)
                    .ok_or("all milestones released")?;
                if index != next {
                    return Err(format!("milestone {index} is not next (expected {next})"));
                }
                let amount = pool.milestones[index].amount;
                if amount > record.balance {
                    return Err("insufficient balance for milestone".into());
                }
                pool.milestones[index].released = true;
                record.balance -= amount;
                Ok(amount)
            }
            (CampaignType::Recurring, ReleaseCall::RecurringWithdraw { amount }) => {
                if now < next_eligible_after(record.last_withdraw_time, record.period_secs) {
                    return Err("withdrawal period has not elapsed".into());
                }
                if amount <= Decimal::ZERO {
                    return Err("amount must be positive".into());
                }
                if amount > record.cap {
                    return Err("amount exceeds cap".into());
                }
                if amount > record.balance {
                    return Err("insufficient balance".into());
                }
                record.balance -= amount;
                record.last_withdraw_time = now;
                Ok(amount)
            }
            (CampaignType::AllOrNothing, ReleaseCall::ClaimFunds) => {
                if record.claimed {
                    return Err("funds already claimed".into());
                }
                if now < record.deadline {
                    return Err("deadline not reached".into());
                }
                if record.goal_amount <= Decimal::ZERO || record.total_donated < record.goal_amount {
                    return Err("goal not met".into());
                }
                let amount = record.balance;
                record.balance = Decimal::ZERO;
                record.claimed = true;
                Ok(amount)
            }
            (kind, call) => Err(format!("{call:?} is not supported by {kind} campaigns")),
        }
    }
}

#[async_trait]
impl CampaignLedger for InMemoryLedger {
    async fn read_campaign(&self, address: &CampaignAddress) -> Result<CampaignRecord, LedgerError> {
        self.simulate_latency().await;
        self.check_reachable().await?;
        self.pools
            .lock()
            .await
            .get(address)
            .map(|pool| pool.record.clone())
            .ok_or_else(|| LedgerError::CampaignNotFound(address.clone()))
    }

    async fn read_milestones(
        &self,
        address: &CampaignAddress,
        capacity: usize,
    ) -> Result<Vec<Milestone>, LedgerError> {
        self.simulate_latency().await;
        self.check_reachable().await?;
        self.pools
            .lock()
            .await
            .get(address)
            .map(|pool| pool.milestones.iter().take(capacity).cloned().collect())
            .ok_or_else(|| LedgerError::CampaignNotFound(address.clone()))
    }

    async fn submit_release(
        &self,
        address: &CampaignAddress,
        actor: &ActorAddress,
        call: ReleaseCall,
    ) -> Result<Receipt, LedgerError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check_reachable().await?;

        let fault = self.faults.lock().await.next_write.take();
        match fault {
            Some(WriteFault::Reject(reason)) => return Err(LedgerError::Rejected(reason)),
            Some(WriteFault::Stall) => std::future::pending::<()>().await,
            None => {}
        }

        let now = self.clock.now();
        let mut pools = self.pools.lock().await;
        let pool = pools
            .get_mut(address)
            .ok_or_else(|| LedgerError::CampaignNotFound(address.clone()))?;

        let released_amount = Self::apply(pool, actor, call, now).map_err(LedgerError::Rejected)?;
        let tx_hash = self.next_tx_hash();
        debug!(
            campaign = %address,
            tx_hash = %tx_hash,
            amount = %released_amount,
            "Ledger applied release"
        );

        Ok(Receipt {
            tx_hash,
            released_amount,
            confirmed_at: now,
        })
    }
}
