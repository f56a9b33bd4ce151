//! Submission tests against the in-memory ledger.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use fundrelease_shared::types::{ActorAddress, CampaignAddress};

use crate::clock::ManualClock;
use crate::ledger::{
    CampaignLedger, CampaignTerms, InMemoryLedger, MilestoneTerms, NewCampaign, ReleaseCall,
    WriteFault,
};
use crate::policy::{DenialReason, WithdrawalRequest};
use crate::reconcile::{LedgerBalanceReconciler, ReconcilerSettings};

use super::error::{TxError, TxErrorCategory};
use super::service::TransactionCoordinator;

fn campaign() -> CampaignAddress {
    CampaignAddress::parse("0xe000000000000000000000000000000000000001").unwrap()
}

fn owner() -> ActorAddress {
    ActorAddress::parse("0xf000000000000000000000000000000000000001").unwrap()
}

struct Harness {
    ledger: Arc<InMemoryLedger>,
    reconciler: Arc<LedgerBalanceReconciler>,
    coordinator: TransactionCoordinator,
    clock: Arc<ManualClock>,
}

async fn harness(terms: CampaignTerms, donated: Decimal, latency: Duration, now: i64) -> Harness {
    let clock = Arc::new(ManualClock::at_unix(now));
    let ledger = Arc::new(InMemoryLedger::new(clock.clone()).with_latency(latency));
    ledger
        .open(NewCampaign {
            address: campaign(),
            owner: owner(),
            goal_amount: dec!(100),
            donated,
            terms,
        })
        .await
        .unwrap();

    let reconciler = Arc::new(LedgerBalanceReconciler::new(
        ledger.clone(),
        clock.clone(),
        ReconcilerSettings::default(),
    ));
    let coordinator = TransactionCoordinator::new(ledger.clone(), reconciler.clone(), clock.clone())
        .with_confirmation_timeout(Duration::from_secs(5));

    Harness {
        ledger,
        reconciler,
        coordinator,
        clock,
    }
}

fn request(amount: Decimal) -> WithdrawalRequest {
    WithdrawalRequest::amount(campaign(), amount, DateTime::default())
}

#[tokio::test]
async fn test_confirmed_withdrawal_refreshes_projection() {
    let h = harness(CampaignTerms::Flexible, dec!(10), Duration::ZERO, 0).await;

    let confirmation = h.coordinator.submit(&owner(), &request(dec!(4))).await.unwrap();
    assert_eq!(confirmation.released_amount, dec!(4));
    assert_eq!(confirmation.call, ReleaseCall::Withdraw { amount: dec!(4) });

    let projection = confirmation.projection.unwrap();
    assert!(!projection.stale);
    assert_eq!(projection.campaign.ledger_balance, dec!(6));
    assert!(!h.coordinator.is_in_flight(&campaign()));
}

#[tokio::test]
async fn test_policy_denial_never_reaches_ledger() {
    let h = harness(CampaignTerms::Flexible, dec!(2), Duration::ZERO, 0).await;

    let result = h.coordinator.submit(&owner(), &request(dec!(3))).await;
    assert_eq!(
        result,
        Err(TxError::Policy(DenialReason::InsufficientBalance {
            required: dec!(3),
            available: dec!(2)
        }))
    );
    assert_eq!(h.ledger.write_calls(), 0);
    assert!(!h.reconciler.is_stale(&campaign()));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_submits_yield_one_in_progress() {
    let h = harness(CampaignTerms::Flexible, dec!(10), Duration::from_millis(200), 0).await;
    h.reconciler.refresh(&campaign()).await.unwrap();

    let actor = owner();
    let first = request(dec!(1));
    let second = request(dec!(2));
    let (a, b) = tokio::join!(
        h.coordinator.submit(&actor, &first),
        h.coordinator.submit(&actor, &second),
    );

    let outcomes = [a, b];
    let in_progress = outcomes
        .iter()
        .filter(|r| matches!(r, Err(TxError::WithdrawalInProgress(_))))
        .count();
    assert_eq!(in_progress, 1);
    assert!(
        outcomes
            .iter()
            .any(|r| r.as_ref().is_ok_and(|c| c.released_amount == dec!(1)))
    );
    assert_eq!(h.ledger.write_calls(), 1);
}

#[tokio::test]
async fn test_second_claim_is_already_claimed_without_ledger_call() {
    let terms = CampaignTerms::AllOrNothing {
        deadline: DateTime::from_timestamp(1_000, 0).unwrap(),
    };
    let h = harness(terms, dec!(120), Duration::ZERO, 2_000).await;

    let first = h.coordinator.submit(&owner(), &request(Decimal::ZERO)).await.unwrap();
    assert_eq!(first.released_amount, dec!(120));
    assert_eq!(h.ledger.write_calls(), 1);

    let second = h.coordinator.submit(&owner(), &request(Decimal::ZERO)).await;
    assert_eq!(second, Err(TxError::Policy(DenialReason::AlreadyClaimed)));
    assert_eq!(h.ledger.write_calls(), 1);
}

#[tokio::test]
async fn test_rejection_leaves_projection_stale() {
    let h = harness(CampaignTerms::Flexible, dec!(10), Duration::ZERO, 0).await;
    h.ledger
        .fail_next_write(WriteFault::Reject("execution reverted".into()))
        .await;

    let result = h.coordinator.submit(&owner(), &request(dec!(1))).await;
    let err = result.unwrap_err();
    assert_eq!(err, TxError::LedgerRejected("execution reverted".into()));
    assert!(err.requires_refresh());
    assert!(h.reconciler.is_stale(&campaign()));

    let blocked = h.coordinator.submit(&owner(), &request(dec!(1))).await;
    assert_eq!(blocked, Err(TxError::RefreshRequired(campaign())));

    h.reconciler.refresh(&campaign()).await.unwrap();
    assert!(h.coordinator.submit(&owner(), &request(dec!(1))).await.is_ok());
}

#[tokio::test]
async fn test_non_owner_is_ledger_rejected() {
    let h = harness(CampaignTerms::Flexible, dec!(10), Duration::ZERO, 0).await;
    let stranger = ActorAddress::parse("0x0000000000000000000000000000000000000bad").unwrap();

    let result = h.coordinator.submit(&stranger, &request(dec!(1))).await;
    assert!(matches!(result, Err(TxError::LedgerRejected(_))));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_unknown_and_releases_slot() {
    let h = harness(CampaignTerms::Flexible, dec!(10), Duration::ZERO, 0).await;
    h.ledger.fail_next_write(WriteFault::Stall).await;

    let err = h.coordinator.submit(&owner(), &request(dec!(1))).await.unwrap_err();
    assert!(matches!(err, TxError::Unknown { timeout_secs: 5, .. }));
    assert_eq!(err.category(), TxErrorCategory::Ledger);
    assert!(!h.coordinator.is_in_flight(&campaign()));

    let next = h.coordinator.submit(&owner(), &request(dec!(1))).await;
    assert_eq!(next, Err(TxError::RefreshRequired(campaign())));
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_release_still_lands() {
    let h = harness(CampaignTerms::Flexible, dec!(10), Duration::from_secs(10), 0).await;
    h.reconciler.refresh(&campaign()).await.unwrap();

    let err = h.coordinator.submit(&owner(), &request(dec!(1))).await.unwrap_err();
    assert!(matches!(err, TxError::Unknown { timeout_secs: 5, .. }));
    assert!(h.reconciler.is_stale(&campaign()));

    tokio::time::sleep(Duration::from_secs(60)).await;
    let record = h.ledger.read_campaign(&campaign()).await.unwrap();
    assert_eq!(record.balance, dec!(9));
    assert!(h.reconciler.is_stale(&campaign()));
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_submission_still_lands() {
    let h = harness(CampaignTerms::Flexible, dec!(10), Duration::from_secs(2), 0).await;
    h.reconciler.refresh(&campaign()).await.unwrap();

    let actor = owner();
    let withdrawal = request(dec!(3));
    let abandoned = tokio::time::timeout(
        Duration::from_secs(1),
        h.coordinator.submit(&actor, &withdrawal),
    )
    .await;
    assert!(abandoned.is_err());
    assert!(!h.coordinator.is_in_flight(&campaign()));

    tokio::time::sleep(Duration::from_secs(10)).await;
    let record = h.ledger.read_campaign(&campaign()).await.unwrap();
    assert_eq!(record.balance, dec!(7));
    assert_eq!(h.ledger.write_calls(), 1);
}

#[tokio::test]
async fn test_unreachable_ledger_on_submit() {
    let h = harness(CampaignTerms::Flexible, dec!(10), Duration::ZERO, 0).await;
    h.reconciler.refresh(&campaign()).await.unwrap();
    h.ledger.set_unreachable(true).await;

    let result = h.coordinator.submit(&owner(), &request(dec!(1))).await;
    assert!(matches!(result, Err(TxError::LedgerUnreachable(_))));
    assert!(h.reconciler.is_stale(&campaign()));
}

#[tokio::test]
async fn test_milestones_release_in_sequence() {
    let terms = CampaignTerms::Milestone {
        milestones: vec![
            MilestoneTerms {
                name: "Phase 1".into(),
                description: String::new(),
                amount: dec!(5),
            },
            MilestoneTerms {
                name: "Phase 2".into(),
                description: String::new(),
                amount: dec!(3),
            },
        ],
    };
    let h = harness(terms, dec!(8), Duration::ZERO, 0).await;

    let skip = WithdrawalRequest::milestone(campaign(), 1, DateTime::default());
    assert_eq!(
        h.coordinator.submit(&owner(), &skip).await,
        Err(TxError::Policy(DenialReason::OutOfSequence {
            requested: 1,
            next: 0
        }))
    );

    let first = WithdrawalRequest::milestone(campaign(), 0, DateTime::default());
    let confirmation = h.coordinator.submit(&owner(), &first).await.unwrap();
    assert_eq!(confirmation.call, ReleaseCall::ReleaseMilestone { index: 0 });
    assert_eq!(confirmation.released_amount, dec!(5));

    let confirmation = h.coordinator.submit(&owner(), &skip).await.unwrap();
    assert_eq!(confirmation.released_amount, dec!(3));

    let done = h.coordinator.submit(&owner(), &first).await;
    assert_eq!(
        done,
        Err(TxError::Policy(DenialReason::AllMilestonesReleased))
    );
}

#[tokio::test]
async fn test_milestones_beyond_capacity_block_submission() {
    let terms = CampaignTerms::Milestone {
        milestones: (0..11)
            .map(|i| MilestoneTerms {
                name: format!("Phase {}", i + 1),
                description: String::new(),
                amount: dec!(1),
            })
            .collect(),
    };
    let h = harness(terms, dec!(11), Duration::ZERO, 0).await;

    let last = WithdrawalRequest::milestone(campaign(), 10, DateTime::default());
    let result = h.coordinator.submit(&owner(), &last).await;
    assert!(matches!(result, Err(TxError::InconsistentLedger(_))), "got {result:?}");
    assert_eq!(h.ledger.write_calls(), 0);
}

#[tokio::test]
async fn test_recurring_cooldown_after_confirmed_withdrawal() {
    let terms = CampaignTerms::Recurring {
        cap: dec!(4),
        period_secs: 2_592_000,
    };
    let h = harness(terms, dec!(10), Duration::ZERO, 2_592_000).await;

    h.coordinator.submit(&owner(), &request(dec!(4))).await.unwrap();

    let again = h.coordinator.submit(&owner(), &request(dec!(1))).await;
    assert_eq!(
        again,
        Err(TxError::Policy(DenialReason::CooldownActive {
            next_eligible: DateTime::from_timestamp(5_184_000, 0).unwrap()
        }))
    );

    h.clock.advance(chrono::Duration::seconds(2_592_000));
    let confirmation = h.coordinator.submit(&owner(), &request(dec!(4))).await.unwrap();
    assert_eq!(
        confirmation.projection.unwrap().campaign.ledger_balance,
        dec!(2)
    );
    let record = h.ledger.read_campaign(&campaign()).await.unwrap();
    assert_eq!(record.balance, dec!(2));
}
