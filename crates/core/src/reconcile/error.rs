//! Reconciliation errors.

use thiserror::Error;

use fundrelease_shared::types::CampaignAddress;

use crate::ledger::LedgerError;

/// Errors raised while rebuilding a campaign projection from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The ledger could not be read. The previous projection is kept.
    #[error("Ledger unreachable: {0}")]
    LedgerUnreachable(String),

    /// No campaign exists at this address.
    #[error("Campaign not found: {0}")]
    CampaignNotFound(CampaignAddress),

    /// The projection was marked stale while the read was in progress.
    #[error("Refresh of {0} was superseded by a newer state change")]
    Superseded(CampaignAddress),

    /// The ledger returned data that violates campaign invariants.
    #[error("Inconsistent ledger data: {0}")]
    InconsistentLedger(String),
}

impl ReconcileError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::LedgerUnreachable(_) => "LEDGER_UNREACHABLE",
            Self::CampaignNotFound(_) => "CAMPAIGN_NOT_FOUND",
            Self::Superseded(_) => "REFRESH_SUPERSEDED",
            Self::InconsistentLedger(_) => "INCONSISTENT_LEDGER",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::LedgerUnreachable(_) => 503,
            Self::CampaignNotFound(_) => 404,
            Self::Superseded(_) => 409,
            Self::InconsistentLedger(_) => 502,
        }
    }

    /// Returns true if retrying later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LedgerUnreachable(_) | Self::Superseded(_))
    }
}

impl From<LedgerError> for ReconcileError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Unreachable(msg) => Self::LedgerUnreachable(msg),
            LedgerError::CampaignNotFound(address) => Self::CampaignNotFound(address),
            LedgerError::Rejected(msg) => Self::InconsistentLedger(msg),
        }
    }
}
