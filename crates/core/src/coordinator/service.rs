//! Serialized withdrawal submission.
//!
//! At most one withdrawal per campaign address is in flight through a
//! coordinator at any time. A second submission for the same address fails
//! immediately instead of queuing.
//!
//! Submission steps:
//! 1. Claim the campaign's in-flight slot
//! 2. Re-evaluate the policy against the current projection
//! 3. Mark the projection stale
//! 4. Hand the call to the ledger and wait (bounded) for confirmation
//! 5. On confirmation, refresh the projection; otherwise leave it stale

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fundrelease_shared::types::{ActorAddress, CampaignAddress};

use crate::campaign::{Campaign, CampaignPolicy};
use crate::clock::Clock;
use crate::ledger::{CampaignLedger, LedgerError, Receipt, ReleaseCall};
use crate::policy::{WithdrawalPolicyEngine, WithdrawalRequest};
use crate::reconcile::{LedgerBalanceReconciler, Projection};

use super::error::TxError;
use super::types::Confirmation;

/// Default wait for a ledger confirmation.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy)]
struct InFlight {
    submission_id: Uuid,
    started_at: DateTime<Utc>,
}

/// Releases the in-flight slot when the submission finishes or is dropped.
struct SlotGuard<'a> {
    slots: &'a DashMap<CampaignAddress, InFlight>,
    address: CampaignAddress,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.slots.remove(&self.address);
    }
}

/// Submits withdrawals to the ledger, one per campaign at a time.
pub struct TransactionCoordinator {
    ledger: Arc<dyn CampaignLedger>,
    reconciler: Arc<LedgerBalanceReconciler>,
    clock: Arc<dyn Clock>,
    confirmation_timeout: Duration,
    in_flight: DashMap<CampaignAddress, InFlight>,
}

impl TransactionCoordinator {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn CampaignLedger>,
        reconciler: Arc<LedgerBalanceReconciler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            reconciler,
            clock,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            in_flight: DashMap::new(),
        }
    }

    /// Sets how long to wait for a ledger confirmation.
    #[must_use]
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// Returns true if a withdrawal for `address` awaits confirmation.
    pub fn is_in_flight(&self, address: &CampaignAddress) -> bool {
        self.in_flight.contains_key(address)
    }

    /// Submits a withdrawal as `actor` and waits for the ledger's answer.
    ///
    /// `request.requested_amount` is in native units.
    ///
    /// # Errors
    ///
    /// - `WithdrawalInProgress` if another submission for the campaign is unresolved
    /// - `RefreshRequired` if the projection is stale
    /// - `Policy` if the campaign's policy denies the request (ledger not contacted)
    /// - `LedgerRejected`, `LedgerUnreachable` or `Unknown` from the ledger call;
    ///   the projection stays stale in each case. A call that outlives the
    ///   timeout keeps running and its outcome is logged when it lands.
    pub async fn submit(
        &self,
        actor: &ActorAddress,
        request: &WithdrawalRequest,
    ) -> Result<Confirmation, TxError> {
        let address = &request.campaign_address;
        let submission_id = Uuid::now_v7();
        let _slot = self.claim_slot(address, submission_id)?;

        let projection = self.current_projection(address).await?;
        let now = self.clock.now();
        let verdict = WithdrawalPolicyEngine::evaluate(&projection.campaign, now, request);
        debug!(
            campaign = %address,
            allowed = verdict.allowed,
            max_amount = %verdict.max_amount,
            "Pre-submission evaluation"
        );
        if let Some(reason) = verdict.reason {
            return Err(TxError::Policy(reason));
        }

        let call = release_call(&projection.campaign, request);
        self.reconciler.mark_stale(address);

        // Detached so neither the timeout nor a dropped caller cancels a submitted release.
        let ledger = Arc::clone(&self.ledger);
        let (target, signer) = (address.clone(), actor.clone());
        let mut pending =
            tokio::spawn(async move { ledger.submit_release(&target, &signer, call).await });

        let outcome = tokio::time::timeout(self.confirmation_timeout, &mut pending).await;

        let receipt = match outcome {
            Ok(Ok(Ok(receipt))) => receipt,
            Ok(Ok(Err(e))) => {
                warn!(
                    campaign = %address,
                    submission_id = %submission_id,
                    error = %e,
                    "Withdrawal not applied by ledger"
                );
                return Err(match e {
                    LedgerError::Rejected(reason) => TxError::LedgerRejected(reason),
                    LedgerError::Unreachable(msg) => TxError::LedgerUnreachable(msg),
                    LedgerError::CampaignNotFound(address) => TxError::CampaignNotFound(address),
                });
            }
            Ok(Err(e)) => {
                warn!(
                    campaign = %address,
                    submission_id = %submission_id,
                    error = %e,
                    "Ledger call ended without an answer"
                );
                return Err(TxError::Unknown {
                    submission_id,
                    timeout_secs: self.confirmation_timeout.as_secs(),
                });
            }
            Err(_elapsed) => {
                warn!(
                    campaign = %address,
                    submission_id = %submission_id,
                    timeout_secs = self.confirmation_timeout.as_secs(),
                    "Withdrawal confirmation timed out"
                );
                tokio::spawn(report_late_outcome(pending, address.clone(), submission_id));
                return Err(TxError::Unknown {
                    submission_id,
                    timeout_secs: self.confirmation_timeout.as_secs(),
                });
            }
        };

        info!(
            campaign = %address,
            submission_id = %submission_id,
            tx_hash = %receipt.tx_hash,
            amount = %receipt.released_amount,
            "Withdrawal confirmed"
        );

        let projection = self
            .reconciler
            .refresh(address)
            .await
            .inspect_err(|e| {
                warn!(
                    campaign = %address,
                    error = %e,
                    "Post-confirmation refresh failed; projection left stale"
                );
            })
            .ok();

        Ok(Confirmation {
            submission_id,
            campaign_address: address.clone(),
            call,
            tx_hash: receipt.tx_hash,
            released_amount: receipt.released_amount,
            confirmed_at: receipt.confirmed_at,
            projection,
        })
    }

    fn claim_slot(
        &self,
        address: &CampaignAddress,
        submission_id: Uuid,
    ) -> Result<SlotGuard<'_>, TxError> {
        match self.in_flight.entry(address.clone()) {
            Entry::Occupied(existing) => {
                let held = existing.get();
                debug!(
                    campaign = %address,
                    holder = %held.submission_id,
                    since = %held.started_at,
                    "Submission rejected, another is in flight"
                );
                Err(TxError::WithdrawalInProgress(address.clone()))
            }
            Entry::Vacant(slot) => {
                slot.insert(InFlight {
                    submission_id,
                    started_at: self.clock.now(),
                });
                Ok(SlotGuard {
                    slots: &self.in_flight,
                    address: address.clone(),
                })
            }
        }
    }

    async fn current_projection(&self, address: &CampaignAddress) -> Result<Projection, TxError> {
        match self.reconciler.projection(address) {
            Some(projection) if projection.stale => {
                warn!(campaign = %address, "Submission against stale projection");
                Err(TxError::RefreshRequired(address.clone()))
            }
            Some(projection) => Ok(projection),
            None => Ok(self.reconciler.refresh(address).await?),
        }
    }
}

/// Logs how a timed-out release finally ended. The projection is left stale.
async fn report_late_outcome(
    pending: JoinHandle<Result<Receipt, LedgerError>>,
    address: CampaignAddress,
    submission_id: Uuid,
) {
    match pending.await {
        Ok(Ok(receipt)) => info!(
            campaign = %address,
            submission_id = %submission_id,
            tx_hash = %receipt.tx_hash,
            amount = %receipt.released_amount,
            "Timed-out withdrawal confirmed late"
        ),
        Ok(Err(e)) => warn!(
            campaign = %address,
            submission_id = %submission_id,
            error = %e,
            "Timed-out withdrawal not applied by ledger"
        ),
        Err(e) => warn!(
            campaign = %address,
            submission_id = %submission_id,
            error = %e,
            "Timed-out withdrawal ended without an answer"
        ),
    }
}

/// Picks the ledger call for the campaign's policy.
fn release_call(campaign: &Campaign, request: &WithdrawalRequest) -> ReleaseCall {
    match &campaign.policy {
        CampaignPolicy::Flexible => ReleaseCall::Withdraw {
            amount: request.requested_amount,
        },
        CampaignPolicy::Milestone { .. } => ReleaseCall::ReleaseMilestone {
            index: campaign.next_milestone().map_or(0, |m| m.index),
        },
        CampaignPolicy::Recurring { .. } => ReleaseCall::RecurringWithdraw {
            amount: request.requested_amount,
        },
        CampaignPolicy::AllOrNothing { .. } => ReleaseCall::ClaimFunds,
    }
}
