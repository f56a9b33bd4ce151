//! Withdrawal request and eligibility verdict types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fundrelease_shared::types::CampaignAddress;

use crate::campaign::CampaignType;

/// A withdrawal the caller would like to make. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Campaign to withdraw from.
    pub campaign_address: CampaignAddress,
    /// Requested native amount (ignored by milestone and all-or-nothing policies).
    pub requested_amount: Decimal,
    /// Milestone to release; defaults to the next unreleased one.
    pub milestone_index: Option<usize>,
    /// When the caller made the request.
    pub requested_at: DateTime<Utc>,
}

impl WithdrawalRequest {
    /// Creates a request for a native amount.
    #[must_use]
    pub fn amount(
        campaign_address: CampaignAddress,
        requested_amount: Decimal,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            campaign_address,
            requested_amount,
            milestone_index: None,
            requested_at,
        }
    }

    /// Creates a request to release one milestone.
    #[must_use]
    pub fn milestone(
        campaign_address: CampaignAddress,
        milestone_index: usize,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            campaign_address,
            requested_amount: Decimal::ZERO,
            milestone_index: Some(milestone_index),
            requested_at,
        }
    }
}

/// Why a withdrawal may not proceed right now.
///
/// Each variant carries the exact blocking condition so callers can render
/// countdowns and explanations.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    /// Requested amount is zero or negative.
    #[error("Requested amount must be positive, got {requested}")]
    InvalidAmount {
        /// What was requested.
        requested: Decimal,
    },

    /// The pool does not hold enough to cover the request.
    #[error("Insufficient balance: requires {required}, available {available}")]
    InsufficientBalance {
        /// Native amount the withdrawal needs.
        required: Decimal,
        /// Native amount the pool holds.
        available: Decimal,
    },

    /// Request is above the per-period cap.
    #[error("Requested {requested} exceeds the per-period cap of {cap}")]
    ExceedsCap {
        /// What was requested.
        requested: Decimal,
        /// The campaign's cap.
        cap: Decimal,
    },

    /// Targeted milestone is not the next one in order.
    #[error("Milestone {requested} is out of sequence; next releasable milestone is {next}")]
    OutOfSequence {
        /// Index the caller targeted.
        requested: usize,
        /// Index of the first unreleased milestone.
        next: usize,
    },

    /// Every milestone has been released.
    #[error("All milestones have been released")]
    AllMilestonesReleased,

    /// The recurring period has not elapsed since the last withdrawal.
    #[error("Cooldown active until {next_eligible}")]
    CooldownActive {
        /// Earliest time the next withdrawal is allowed.
        next_eligible: DateTime<Utc>,
    },

    /// The campaign deadline has not passed yet.
    #[error("Funds can only be claimed after the deadline {deadline}")]
    BeforeDeadline {
        /// Campaign deadline.
        deadline: DateTime<Utc>,
    },

    /// The deadline passed without reaching the goal. Permanent.
    #[error("Goal not met: raised {raised} of {goal}")]
    GoalNotMet {
        /// Fundraising goal.
        goal: Decimal,
        /// Total donated.
        raised: Decimal,
    },

    /// The pool was already claimed.
    #[error("Funds have already been claimed")]
    AlreadyClaimed,
}

impl DenialReason {
    /// Returns the reason code for API responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::ExceedsCap { .. } => "EXCEEDS_CAP",
            Self::OutOfSequence { .. } => "OUT_OF_SEQUENCE",
            Self::AllMilestonesReleased => "ALL_MILESTONES_RELEASED",
            Self::CooldownActive { .. } => "COOLDOWN_ACTIVE",
            Self::BeforeDeadline { .. } => "BEFORE_DEADLINE",
            Self::GoalNotMet { .. } => "GOAL_NOT_MET",
            Self::AlreadyClaimed => "ALREADY_CLAIMED",
        }
    }

    /// Returns true if no later state of this campaign can lift the denial.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::AllMilestonesReleased | Self::GoalNotMet { .. } | Self::AlreadyClaimed
        )
    }

    /// Returns true if the denial is about the request itself rather than the campaign.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidAmount { .. })
    }
}

/// Verdict on whether a withdrawal may proceed now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    /// Policy the verdict was reached under.
    pub campaign_type: CampaignType,
    /// Whether the withdrawal may proceed.
    pub allowed: bool,
    /// Largest native amount the policy permits right now.
    pub max_amount: Decimal,
    /// Blocking condition when `allowed` is false.
    pub reason: Option<DenialReason>,
    /// When a time-gated policy next opens (recurring window or deadline).
    pub next_eligible: Option<DateTime<Utc>>,
}

impl Eligibility {
    /// Creates an allowing verdict.
    #[must_use]
    pub const fn allowed(campaign_type: CampaignType, max_amount: Decimal) -> Self {
        Self {
            campaign_type,
            allowed: true,
            max_amount,
            reason: None,
            next_eligible: None,
        }
    }

    /// Creates a denying verdict.
    #[must_use]
    pub const fn denied(
        campaign_type: CampaignType,
        max_amount: Decimal,
        reason: DenialReason,
    ) -> Self {
        Self {
            campaign_type,
            allowed: false,
            max_amount,
            reason: Some(reason),
            next_eligible: None,
        }
    }

    /// Attaches the next time-gate opening.
    #[must_use]
    pub const fn with_next_eligible(mut self, at: DateTime<Utc>) -> Self {
        self.next_eligible = Some(at);
        self
    }

}
