//! Caller-facing withdrawal operations.
//!
//! Callers work in the display currency. The engine converts to native units
//! (truncating, never rounding up), applies the projection freshness rules and
//! delegates to the policy engine, the coordinator and the reconciler.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use fundrelease_shared::AppConfig;
use fundrelease_shared::types::{ActorAddress, CampaignAddress, Currency, Money};

use crate::campaign::CampaignType;
use crate::clock::Clock;
use crate::coordinator::{
    Confirmation, DEFAULT_CONFIRMATION_TIMEOUT, TransactionCoordinator, TxError,
};
use crate::currency::{CurrencyConverter, ExchangeRate, RateBook, WithdrawAllQuote};
use crate::ledger::CampaignLedger;
use crate::policy::{Eligibility, WithdrawalPolicyEngine, WithdrawalRequest};
use crate::reconcile::{LedgerBalanceReconciler, Projection, ReconcilerSettings};

/// Engine tuning.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Currency amounts are entered and shown in.
    pub display_currency: Currency,
    /// Wait for a ledger confirmation before reporting `Unknown`.
    pub confirmation_timeout: Duration,
    /// Reconciler tuning.
    pub reconciler: ReconcilerSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            display_currency: Currency::Myr,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            reconciler: ReconcilerSettings::default(),
        }
    }
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            display_currency: config.rates.display_currency,
            confirmation_timeout: config.ledger.confirmation_timeout(),
            reconciler: ReconcilerSettings {
                milestone_capacity: config.ledger.milestone_capacity,
                projection_ttl: Duration::from_secs(config.projection.ttl_secs),
            },
        }
    }
}

/// Result of evaluating a display-currency request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Policy verdict in native units.
    pub eligibility: Eligibility,
    /// Native amount the display input converted to (zero when the policy fixes the amount).
    pub requested_native: Decimal,
    /// `eligibility.max_amount` in the display currency, when a rate is known.
    pub max_amount_display: Option<Money>,
    /// Display currency used.
    pub display_currency: Currency,
}

/// Entry point for evaluating, submitting and refreshing withdrawals.
pub struct WithdrawalEngine {
    reconciler: Arc<LedgerBalanceReconciler>,
    coordinator: TransactionCoordinator,
    rates: RateBook,
    clock: Arc<dyn Clock>,
    display_currency: Currency,
}

impl WithdrawalEngine {
    /// Wires an engine over `ledger`.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn CampaignLedger>,
        rates: RateBook,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let reconciler = Arc::new(LedgerBalanceReconciler::new(
            ledger.clone(),
            clock.clone(),
            settings.reconciler,
        ));
        let coordinator = TransactionCoordinator::new(ledger, reconciler.clone(), clock.clone())
            .with_confirmation_timeout(settings.confirmation_timeout);
        Self {
            reconciler,
            coordinator,
            rates,
            clock,
            display_currency: settings.display_currency,
        }
    }

    /// Currency amounts are entered and shown in.
    #[must_use]
    pub const fn display_currency(&self) -> Currency {
        self.display_currency
    }

    /// Current exchange rate for the display currency, if known.
    #[must_use]
    pub fn rate(&self) -> Option<ExchangeRate> {
        self.rates.current(self.display_currency)
    }

    /// Evaluates a withdrawal of `display_amount` without submitting it.
    ///
    /// An unknown campaign is read from the ledger first.
    ///
    /// # Errors
    ///
    /// - `RefreshRequired` / `WithdrawalInProgress` if the projection is stale
    /// - `Currency` if the amount cannot be converted
    /// - Reconciliation errors from the initial read
    pub async fn evaluate(
        &self,
        address: &CampaignAddress,
        display_amount: Decimal,
        milestone_index: Option<usize>,
    ) -> Result<Evaluation, TxError> {
        let projection = self.fresh_projection(address).await?;
        let rate = self.rate();
        let requested_native =
            self.requested_native(projection.campaign.campaign_type(), display_amount, rate)?;

        let now = self.clock.now();
        let request = WithdrawalRequest {
            campaign_address: address.clone(),
            requested_amount: requested_native,
            milestone_index,
            requested_at: now,
        };
        let eligibility = WithdrawalPolicyEngine::evaluate(&projection.campaign, now, &request);
        debug!(
            campaign = %address,
            amount = %requested_native,
            allowed = eligibility.allowed,
            reason = eligibility.reason.as_ref().map(|r| r.code()),
            "Withdrawal evaluated"
        );

        let max_amount_display = rate
            .and_then(|r| CurrencyConverter::to_display(eligibility.max_amount, Some(&r)).ok())
            .map(|amount| Money::new(amount, self.display_currency));

        Ok(Evaluation {
            eligibility,
            requested_native,
            max_amount_display,
            display_currency: self.display_currency,
        })
    }

    /// Submits a withdrawal of `display_amount` as `actor`.
    ///
    /// # Errors
    ///
    /// See [`TransactionCoordinator::submit`]; conversion failures are
    /// reported before the coordinator is involved.
    pub async fn submit(
        &self,
        address: &CampaignAddress,
        actor: &ActorAddress,
        display_amount: Decimal,
        milestone_index: Option<usize>,
    ) -> Result<Confirmation, TxError> {
        let campaign_type = match self.reconciler.projection(address) {
            Some(projection) => projection.campaign.campaign_type(),
            None => self.reconciler.refresh(address).await?.campaign.campaign_type(),
        };
        let requested_native = self.requested_native(campaign_type, display_amount, self.rate())?;

        let request = WithdrawalRequest {
            campaign_address: address.clone(),
            requested_amount: requested_native,
            milestone_index,
            requested_at: self.clock.now(),
        };
        self.coordinator.submit(actor, &request).await
    }

    /// Re-reads the campaign from the ledger.
    ///
    /// # Errors
    ///
    /// `WithdrawalInProgress` while a submission for the campaign is
    /// unresolved; otherwise reconciliation errors.
    pub async fn refresh(&self, address: &CampaignAddress) -> Result<Projection, TxError> {
        if self.coordinator.is_in_flight(address) {
            return Err(TxError::WithdrawalInProgress(address.clone()));
        }
        Ok(self.reconciler.refresh(address).await?)
    }

    /// Returns the campaign's projection, reading it first if unknown.
    ///
    /// Stale projections are returned as-is, flagged.
    ///
    /// # Errors
    ///
    /// Reconciliation errors from the initial read.
    pub async fn projection(&self, address: &CampaignAddress) -> Result<Projection, TxError> {
        match self.reconciler.projection(address) {
            Some(projection) => Ok(projection),
            None => Ok(self.reconciler.refresh(address).await?),
        }
    }

    /// Quotes the largest amount a "withdraw all" action may request, in
    /// both units.
    ///
    /// # Errors
    ///
    /// Freshness errors as for [`WithdrawalEngine::evaluate`]; `Currency`
    /// if no rate is known.
    pub async fn quote_withdraw_all(
        &self,
        address: &CampaignAddress,
    ) -> Result<WithdrawAllQuote, TxError> {
        let projection = self.fresh_projection(address).await?;
        let ceiling = WithdrawalPolicyEngine::withdrawable_ceiling(&projection.campaign);
        Ok(CurrencyConverter::withdraw_all(ceiling, self.rate().as_ref())?)
    }

    async fn fresh_projection(&self, address: &CampaignAddress) -> Result<Projection, TxError> {
        match self.reconciler.projection(address) {
            Some(projection) if projection.stale => {
                if self.coordinator.is_in_flight(address) {
                    Err(TxError::WithdrawalInProgress(address.clone()))
                } else {
                    Err(TxError::RefreshRequired(address.clone()))
                }
            }
            Some(projection) => Ok(projection),
            None => Ok(self.reconciler.refresh(address).await?),
        }
    }

    fn requested_native(
        &self,
        campaign_type: CampaignType,
        display_amount: Decimal,
        rate: Option<ExchangeRate>,
    ) -> Result<Decimal, TxError> {
        if !campaign_type.takes_amount() {
            return Ok(Decimal::ZERO);
        }
        let native = CurrencyConverter::to_native(display_amount, rate.as_ref())?;
        debug!(
            display = %display_amount,
            currency = %self.display_currency,
            native = %native,
            "Converted requested amount"
        );
        Ok(native)
    }
}
