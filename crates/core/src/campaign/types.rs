//! Campaign domain types.
//!
//! A campaign's withdrawal policy is chosen at creation and never changes.
//! Each policy variant carries only the fields that policy needs, so a policy
//! evaluation is an exhaustive match over `CampaignPolicy`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fundrelease_shared::types::CampaignAddress;

/// Withdrawal policy discriminant, as encoded by the ledger (`uint8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    /// Any amount up to the balance, any time.
    Flexible,
    /// Fixed tranches released strictly in order.
    Milestone,
    /// Capped amount once per period.
    Recurring,
    /// Whole pool after the deadline, only if the goal was met.
    AllOrNothing,
}

impl CampaignType {
    /// Decodes the ledger's numeric campaign type.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Flexible),
            1 => Some(Self::Milestone),
            2 => Some(Self::Recurring),
            3 => Some(Self::AllOrNothing),
            _ => None,
        }
    }

    /// Returns the ledger's numeric code for this type.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Flexible => 0,
            Self::Milestone => 1,
            Self::Recurring => 2,
            Self::AllOrNothing => 3,
        }
    }

    /// Returns true if requests of this type carry a caller-chosen amount.
    #[must_use]
    pub const fn takes_amount(self) -> bool {
        matches!(self, Self::Flexible | Self::Recurring)
    }
}

impl std::fmt::Display for CampaignType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Flexible => "flexible",
            Self::Milestone => "milestone",
            Self::Recurring => "recurring",
            Self::AllOrNothing => "all_or_nothing",
        };
        f.write_str(name)
    }
}

/// A named release tranche of a milestone campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Position in the release order (0-based).
    pub index: usize,
    /// Short name shown to donors.
    pub name: String,
    /// What the tranche pays for.
    pub description: String,
    /// Native amount released with this tranche.
    pub amount: Decimal,
    /// Whether the tranche has been released. Never reverts.
    pub released: bool,
}

/// Policy-specific campaign state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CampaignPolicy {
    /// No time or sequencing constraint.
    Flexible,
    /// Ordered tranches; order is fixed at creation.
    Milestone {
        /// Tranches in release order.
        milestones: Vec<Milestone>,
    },
    /// One capped withdrawal per period.
    Recurring {
        /// Maximum native amount per withdrawal.
        cap: Decimal,
        /// Minimum seconds between withdrawals.
        period_secs: u64,
        /// Time of the last confirmed withdrawal (unix epoch if never).
        last_withdraw_time: DateTime<Utc>,
    },
    /// Single claim of the whole pool.
    AllOrNothing {
        /// Earliest claim time.
        deadline: DateTime<Utc>,
        /// Whether the pool has been claimed. Set once.
        claimed: bool,
    },
}

impl CampaignPolicy {
    /// Returns the discriminant of this policy.
    #[must_use]
    pub const fn campaign_type(&self) -> CampaignType {
        match self {
            Self::Flexible => CampaignType::Flexible,
            Self::Milestone { .. } => CampaignType::Milestone,
            Self::Recurring { .. } => CampaignType::Recurring,
            Self::AllOrNothing { .. } => CampaignType::AllOrNothing,
        }
    }
}

/// Projection of one campaign's ledger-owned state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Ledger identifier of the pool.
    pub address: CampaignAddress,
    /// Fundraising goal in native units.
    pub goal_amount: Decimal,
    /// Everything ever donated. Never decreases.
    pub total_donated: Decimal,
    /// What the pool holds right now.
    pub ledger_balance: Decimal,
    /// Policy-specific state.
    pub policy: CampaignPolicy,
}

impl Campaign {
    /// Returns the campaign's withdrawal policy type.
    #[must_use]
    pub const fn campaign_type(&self) -> CampaignType {
        self.policy.campaign_type()
    }

    /// Returns the first unreleased milestone, if this is a milestone campaign.
    #[must_use]
    pub fn next_milestone(&self) -> Option<&Milestone> {
        match &self.policy {
            CampaignPolicy::Milestone { milestones } => milestones.iter().find(|m| !m.released),
            _ => None,
        }
    }

    /// Returns true if the goal is set and donations reached it.
    #[must_use]
    pub fn goal_met(&self) -> bool {
        self.goal_amount > Decimal::ZERO && self.total_donated >= self.goal_amount
    }
}

/// Returns `last + period_secs`, saturating at the latest representable instant.
#[must_use]
pub fn next_eligible_after(last: DateTime<Utc>, period_secs: u64) -> DateTime<Utc> {
    i64::try_from(period_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|period| last.checked_add_signed(period))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn address() -> CampaignAddress {
        CampaignAddress::parse("0x1111111111111111111111111111111111111111").unwrap()
    }

    fn milestone(index: usize, amount: Decimal, released: bool) -> Milestone {
        Milestone {
            index,
            name: format!("Phase {index}"),
            description: String::new(),
            amount,
            released,
        }
    }

    #[test]
    fn test_campaign_type_codes() {
        for ty in [
            CampaignType::Flexible,
            CampaignType::Milestone,
            CampaignType::Recurring,
            CampaignType::AllOrNothing,
        ] {
            assert_eq!(CampaignType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(CampaignType::from_code(4), None);
    }

    #[test]
    fn test_takes_amount() {
        assert!(CampaignType::Flexible.takes_amount());
        assert!(CampaignType::Recurring.takes_amount());
        assert!(!CampaignType::Milestone.takes_amount());
        assert!(!CampaignType::AllOrNothing.takes_amount());
    }

    #[test]
    fn test_next_milestone_is_first_unreleased() {
        let campaign = Campaign {
            address: address(),
            goal_amount: dec!(10),
            total_donated: dec!(10),
            ledger_balance: dec!(5),
            policy: CampaignPolicy::Milestone {
                milestones: vec![
                    milestone(0, dec!(5), true),
                    milestone(1, dec!(3), false),
                    milestone(2, dec!(2), false),
                ],
            },
        };
        assert_eq!(campaign.next_milestone().map(|m| m.index), Some(1));
    }

    #[test]
    fn test_next_eligible_saturates() {
        let last = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(next_eligible_after(last, u64::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_goal_met_requires_positive_goal() {
        let mut campaign = Campaign {
            address: address(),
            goal_amount: Decimal::ZERO,
            total_donated: dec!(5),
            ledger_balance: dec!(5),
            policy: CampaignPolicy::Flexible,
        };
        assert!(!campaign.goal_met());

        campaign.goal_amount = dec!(5);
        assert!(campaign.goal_met());

        campaign.goal_amount = dec!(5.000001);
        assert!(!campaign.goal_met());
    }

    #[test]
    fn test_policy_serializes_with_type_tag() {
        let json = serde_json::to_value(CampaignPolicy::AllOrNothing {
            deadline: DateTime::from_timestamp(0, 0).unwrap(),
            claimed: false,
        })
        .unwrap();
        assert_eq!(json["type"], "all_or_nothing");
        assert_eq!(json["claimed"], false);
    }
}
