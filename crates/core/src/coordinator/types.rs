//! Submission outcome types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fundrelease_shared::types::CampaignAddress;

use crate::ledger::ReleaseCall;
use crate::reconcile::Projection;

/// A withdrawal the ledger confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Local identifier of the submission (UUID v7).
    pub submission_id: Uuid,
    /// Campaign the funds left.
    pub campaign_address: CampaignAddress,
    /// Ledger call that was made.
    pub call: ReleaseCall,
    /// Ledger transaction identifier.
    pub tx_hash: String,
    /// Native amount released.
    pub released_amount: Decimal,
    /// When the ledger confirmed.
    pub confirmed_at: DateTime<Utc>,
    /// Projection re-read after confirmation.
    ///
    /// `None` if the follow-up refresh failed; the campaign then stays stale
    /// until a caller refresh succeeds.
    pub projection: Option<Projection>,
}
