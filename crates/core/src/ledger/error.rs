//! External ledger errors.

use thiserror::Error;

use fundrelease_shared::types::CampaignAddress;

/// Errors reported by the external ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The ledger refused the state change.
    #[error("Ledger rejected the transaction: {0}")]
    Rejected(String),

    /// The ledger could not be reached.
    #[error("Ledger unreachable: {0}")]
    Unreachable(String),

    /// No campaign exists at this address.
    #[error("Campaign not found: {0}")]
    CampaignNotFound(CampaignAddress),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "LEDGER_REJECTED",
            Self::Unreachable(_) => "LEDGER_UNREACHABLE",
            Self::CampaignNotFound(_) => "CAMPAIGN_NOT_FOUND",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Rejected(_) => 409,
            Self::Unreachable(_) => 503,
            Self::CampaignNotFound(_) => 404,
        }
    }

    /// Returns true if retrying later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}
