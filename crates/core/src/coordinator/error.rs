//! Withdrawal submission errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use fundrelease_shared::types::CampaignAddress;

use crate::currency::CurrencyError;
use crate::policy::DenialReason;
use crate::reconcile::ReconcileError;

/// Coarse classification of a [`TxError`], driving how callers react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxErrorCategory {
    /// Bad input; fix it locally. Never reached the ledger.
    Validation,
    /// Expected policy outcome; show the blocking condition.
    Policy,
    /// Another withdrawal is in flight; wait and retry.
    Concurrency,
    /// Local state can no longer be trusted; refresh before submitting again.
    Ledger,
}

/// Errors returned by withdrawal evaluation and submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    /// Amount could not be converted.
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// The campaign's policy denies the withdrawal.
    #[error("Withdrawal denied: {0}")]
    Policy(#[from] DenialReason),

    /// A withdrawal for this campaign is already awaiting confirmation.
    #[error("A withdrawal for campaign {0} is already in progress")]
    WithdrawalInProgress(CampaignAddress),

    /// The projection is stale and must be refreshed first.
    #[error("Campaign {0} must be refreshed before the next withdrawal")]
    RefreshRequired(CampaignAddress),

    /// No campaign exists at this address.
    #[error("Campaign not found: {0}")]
    CampaignNotFound(CampaignAddress),

    /// The ledger refused the transaction.
    #[error("Ledger rejected the withdrawal: {0}")]
    LedgerRejected(String),

    /// The ledger could not be reached.
    #[error("Ledger unreachable: {0}")]
    LedgerUnreachable(String),

    /// The ledger returned data that violates campaign invariants.
    #[error("Inconsistent ledger data: {0}")]
    InconsistentLedger(String),

    /// No confirmation arrived in time; the transaction may still land.
    #[error("Outcome of submission {submission_id} unknown after {timeout_secs}s")]
    Unknown {
        /// Local identifier of the submission.
        submission_id: Uuid,
        /// Timeout that elapsed.
        timeout_secs: u64,
    },
}

impl TxError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> TxErrorCategory {
        match self {
            Self::Currency(_) | Self::CampaignNotFound(_) => TxErrorCategory::Validation,
            Self::Policy(reason) if reason.is_validation() => TxErrorCategory::Validation,
            Self::Policy(_) => TxErrorCategory::Policy,
            Self::WithdrawalInProgress(_) => TxErrorCategory::Concurrency,
            Self::RefreshRequired(_)
            | Self::LedgerRejected(_)
            | Self::LedgerUnreachable(_)
            | Self::InconsistentLedger(_)
            | Self::Unknown { .. } => TxErrorCategory::Ledger,
        }
    }

    /// Returns true if a refresh must succeed before another submission.
    #[must_use]
    pub const fn requires_refresh(&self) -> bool {
        matches!(self.category(), TxErrorCategory::Ledger)
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Currency(e) => e.error_code(),
            Self::Policy(reason) => reason.code(),
            Self::WithdrawalInProgress(_) => "WITHDRAWAL_IN_PROGRESS",
            Self::RefreshRequired(_) => "REFRESH_REQUIRED",
            Self::CampaignNotFound(_) => "CAMPAIGN_NOT_FOUND",
            Self::LedgerRejected(_) => "LEDGER_REJECTED",
            Self::LedgerUnreachable(_) => "LEDGER_UNREACHABLE",
            Self::InconsistentLedger(_) => "INCONSISTENT_LEDGER",
            Self::Unknown { .. } => "OUTCOME_UNKNOWN",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Currency(e) => e.http_status_code(),
            Self::Policy(reason) if reason.is_validation() => 400,
            Self::Policy(_) => 422,
            Self::WithdrawalInProgress(_) | Self::RefreshRequired(_) | Self::LedgerRejected(_) => {
                409
            }
            Self::CampaignNotFound(_) => 404,
            Self::LedgerUnreachable(_) => 503,
            Self::InconsistentLedger(_) => 502,
            Self::Unknown { .. } => 504,
        }
    }

    /// Returns true if the same call may succeed later without changing the input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Currency(e) => e.is_retryable(),
            Self::WithdrawalInProgress(_)
            | Self::RefreshRequired(_)
            | Self::LedgerUnreachable(_)
            | Self::Unknown { .. } => true,
            _ => false,
        }
    }
}

impl From<ReconcileError> for TxError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::LedgerUnreachable(msg) => Self::LedgerUnreachable(msg),
            ReconcileError::CampaignNotFound(address) => Self::CampaignNotFound(address),
            ReconcileError::Superseded(address) => Self::RefreshRequired(address),
            ReconcileError::InconsistentLedger(msg) => Self::InconsistentLedger(msg),
        }
    }
}
