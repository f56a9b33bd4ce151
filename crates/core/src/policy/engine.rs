//! Withdrawal policy evaluation.
//!
//! Evaluation is a pure function of the campaign projection, the current time
//! and the request. It never calls the ledger and never mutates anything, so
//! two evaluations with the same inputs always agree.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::campaign::{Campaign, CampaignPolicy, CampaignType, Milestone, next_eligible_after};
use crate::currency::CurrencyConverter;

use super::types::{DenialReason, Eligibility, WithdrawalRequest};

/// Decides whether a withdrawal may proceed under the campaign's policy.
pub struct WithdrawalPolicyEngine;

impl WithdrawalPolicyEngine {
    /// Evaluates `request` against `campaign` at time `now`.
    ///
    /// `request.requested_amount` is in native units. It is ignored for
    /// milestone and all-or-nothing campaigns, whose amount is fixed by the
    /// policy.
    #[must_use]
    pub fn evaluate(
        campaign: &Campaign,
        now: DateTime<Utc>,
        request: &WithdrawalRequest,
    ) -> Eligibility {
        match &campaign.policy {
            CampaignPolicy::Flexible => Self::evaluate_flexible(campaign, request),
            CampaignPolicy::Milestone { milestones } => {
                Self::evaluate_milestone(campaign, milestones, request)
            }
            CampaignPolicy::Recurring {
                cap,
                period_secs,
                last_withdraw_time,
            } => Self::evaluate_recurring(
                campaign,
                *cap,
                next_eligible_after(*last_withdraw_time, *period_secs),
                now,
                request,
            ),
            CampaignPolicy::AllOrNothing { deadline, claimed } => {
                Self::evaluate_all_or_nothing(campaign, *deadline, *claimed, now)
            }
        }
    }

    /// Native amount a "withdraw all" action would request, ignoring time
    /// gates: the balance, the next tranche, or `min(cap, balance)`.
    #[must_use]
    pub fn withdrawable_ceiling(campaign: &Campaign) -> Decimal {
        match &campaign.policy {
            CampaignPolicy::Flexible | CampaignPolicy::AllOrNothing { .. } => {
                campaign.ledger_balance
            }
            CampaignPolicy::Milestone { .. } => campaign
                .next_milestone()
                .map_or(Decimal::ZERO, |m| m.amount),
            CampaignPolicy::Recurring { cap, .. } => {
                CurrencyConverter::floor_native((*cap).min(campaign.ledger_balance))
            }
        }
    }

    fn evaluate_flexible(campaign: &Campaign, request: &WithdrawalRequest) -> Eligibility {
        let balance = campaign.ledger_balance;
        let amount = request.requested_amount;

        if amount <= Decimal::ZERO {
            return Eligibility::denied(
                CampaignType::Flexible,
                balance,
                DenialReason::InvalidAmount { requested: amount },
            );
        }
        if amount > balance {
            return Eligibility::denied(
                CampaignType::Flexible,
                balance,
                DenialReason::InsufficientBalance {
                    required: amount,
                    available: balance,
                },
            );
        }
        Eligibility::allowed(CampaignType::Flexible, balance)
    }

    fn evaluate_milestone(
        campaign: &Campaign,
        milestones: &[Milestone],
        request: &WithdrawalRequest,
    ) -> Eligibility {
        let Some(next) = milestones.iter().position(|m| !m.released) else {
            return Eligibility::denied(
                CampaignType::Milestone,
                Decimal::ZERO,
                DenialReason::AllMilestonesReleased,
            );
        };

        let tranche = milestones[next].amount;
        let target = request.milestone_index.unwrap_or(next);

        if target != next {
            return Eligibility::denied(
                CampaignType::Milestone,
                tranche,
                DenialReason::OutOfSequence {
                    requested: target,
                    next,
                },
            );
        }
        if campaign.ledger_balance < tranche {
            return Eligibility::denied(
                CampaignType::Milestone,
                tranche,
                DenialReason::InsufficientBalance {
                    required: tranche,
                    available: campaign.ledger_balance,
                },
            );
        }
        Eligibility::allowed(CampaignType::Milestone, tranche)
    }

    fn evaluate_recurring(
        campaign: &Campaign,
        cap: Decimal,
        next_eligible: DateTime<Utc>,
        now: DateTime<Utc>,
        request: &WithdrawalRequest,
    ) -> Eligibility {
        let balance = campaign.ledger_balance;
        let max_amount = CurrencyConverter::floor_native(cap.min(balance));
        let amount = request.requested_amount;

        let verdict = if now < next_eligible {
            Eligibility::denied(
                CampaignType::Recurring,
                max_amount,
                DenialReason::CooldownActive { next_eligible },
            )
        } else if amount <= Decimal::ZERO {
            Eligibility::denied(
                CampaignType::Recurring,
                max_amount,
                DenialReason::InvalidAmount { requested: amount },
            )
        } else if amount > CurrencyConverter::floor_native(cap) {
            Eligibility::denied(
                CampaignType::Recurring,
                max_amount,
                DenialReason::ExceedsCap {
                    requested: amount,
                    cap,
                },
            )
        } else if amount > max_amount {
            Eligibility::denied(
                CampaignType::Recurring,
                max_amount,
                DenialReason::InsufficientBalance {
                    required: amount,
                    available: balance,
                },
            )
        } else {
            Eligibility::allowed(CampaignType::Recurring, max_amount)
        };

        verdict.with_next_eligible(next_eligible)
    }

    fn evaluate_all_or_nothing(
        campaign: &Campaign,
        deadline: DateTime<Utc>,
        claimed: bool,
        now: DateTime<Utc>,
    ) -> Eligibility {
        let balance = campaign.ledger_balance;

        if claimed {
            return Eligibility::denied(
                CampaignType::AllOrNothing,
                balance,
                DenialReason::AlreadyClaimed,
            );
        }
        if now < deadline {
            return Eligibility::denied(
                CampaignType::AllOrNothing,
                balance,
                DenialReason::BeforeDeadline { deadline },
            )
            .with_next_eligible(deadline);
        }
        if !campaign.goal_met() {
            return Eligibility::denied(
                CampaignType::AllOrNothing,
                balance,
                DenialReason::GoalNotMet {
                    goal: campaign.goal_amount,
                    raised: campaign.total_donated,
                },
            );
        }
        Eligibility::allowed(CampaignType::AllOrNothing, balance)
    }
}
