//! Property-based tests for withdrawal policy evaluation.
//!
//! - Flexible withdrawals are allowed exactly when 0 < amount <= balance
//! - Only the lowest unreleased milestone is ever releasable
//! - Recurring withdrawals never open before `last + period`
//! - Evaluation is idempotent

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use fundrelease_shared::types::CampaignAddress;

use crate::campaign::{Campaign, CampaignPolicy, Milestone};

use super::engine::WithdrawalPolicyEngine;
use super::types::WithdrawalRequest;

/// Strategy to generate native amounts (-1.000000 to 10,000.000000).
fn native_amount() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..10_000_000_000i64).prop_map(|micros| Decimal::new(micros, 6))
}

/// Strategy to generate balances (0 to 10,000.000000).
fn balance() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000_000i64).prop_map(|micros| Decimal::new(micros, 6))
}

fn address() -> CampaignAddress {
    CampaignAddress::parse("0x2222222222222222222222222222222222222222").unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn flexible(balance: Decimal) -> Campaign {
    Campaign {
        address: address(),
        goal_amount: Decimal::ZERO,
        total_donated: balance,
        ledger_balance: balance,
        policy: CampaignPolicy::Flexible,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A flexible withdrawal is allowed iff 0 < amount <= balance.
    #[test]
    fn prop_flexible_allowed_iff_within_balance(
        amount in native_amount(),
        balance in balance(),
    ) {
        let c = flexible(balance);
        let req = WithdrawalRequest::amount(address(), amount, at(0));
        let result = WithdrawalPolicyEngine::evaluate(&c, at(0), &req);

        let expected = amount > Decimal::ZERO && amount <= balance;
        prop_assert_eq!(result.allowed, expected);
        prop_assert_eq!(result.max_amount, balance);
        prop_assert_eq!(result.reason.is_none(), result.allowed);
    }

    /// Only the first unreleased milestone can be targeted.
    #[test]
    fn prop_milestone_only_next_releasable(
        released in 0usize..10,
        extra in 1usize..5,
        target in 0usize..15,
    ) {
        let total = released + extra;
        let milestones = (0..total)
            .map(|i| Milestone {
                index: i,
                name: format!("m{i}"),
                description: String::new(),
                amount: Decimal::ONE,
                released: i < released,
            })
            .collect();
        let c = Campaign {
            address: address(),
            goal_amount: Decimal::ZERO,
            total_donated: Decimal::from(total),
            ledger_balance: Decimal::from(extra),
            policy: CampaignPolicy::Milestone { milestones },
        };
        let req = WithdrawalRequest::milestone(address(), target, at(0));
        let result = WithdrawalPolicyEngine::evaluate(&c, at(0), &req);

        prop_assert_eq!(result.allowed, target == released);
    }

    /// Recurring withdrawals stay closed strictly before `last + period`.
    #[test]
    fn prop_recurring_respects_period(
        last in 0i64..1_000_000_000,
        period in 1u64..100_000_000,
        offset in -100_000_000i64..100_000_000,
    ) {
        let c = Campaign {
            address: address(),
            goal_amount: Decimal::ZERO,
            total_donated: Decimal::TEN,
            ledger_balance: Decimal::TEN,
            policy: CampaignPolicy::Recurring {
                cap: Decimal::ONE,
                period_secs: period,
                last_withdraw_time: at(last),
            },
        };
        let opens = last + i64::try_from(period).unwrap();
        let now = at(opens + offset);
        let req = WithdrawalRequest::amount(address(), Decimal::ONE, now);
        let result = WithdrawalPolicyEngine::evaluate(&c, now, &req);

        prop_assert_eq!(result.allowed, offset >= 0);
        prop_assert_eq!(result.next_eligible, Some(at(opens)));
    }

    /// Evaluating twice with the same inputs gives the same verdict.
    #[test]
    fn prop_evaluate_is_idempotent(
        amount in native_amount(),
        balance in balance(),
        now in 0i64..10_000_000,
    ) {
        let c = Campaign {
            address: address(),
            goal_amount: Decimal::ONE,
            total_donated: balance,
            ledger_balance: balance,
            policy: CampaignPolicy::Recurring {
                cap: Decimal::new(5, 0),
                period_secs: 86_400,
                last_withdraw_time: at(0),
            },
        };
        let req = WithdrawalRequest::amount(address(), amount, at(now));
        let first = WithdrawalPolicyEngine::evaluate(&c, at(now), &req);
        let second = WithdrawalPolicyEngine::evaluate(&c, at(now), &req);
        prop_assert_eq!(first, second);
    }
}
