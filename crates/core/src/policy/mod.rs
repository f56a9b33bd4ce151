//! Withdrawal policy rules.
//!
//! Four policies, fixed per campaign at creation:
//!
//! | Policy          | Amount                   | Gate                                   |
//! |-----------------|--------------------------|----------------------------------------|
//! | Flexible        | any, up to balance       | none                                   |
//! | Milestone       | next tranche             | strict order, balance covers tranche   |
//! | Recurring       | up to min(cap, balance)  | `now >= last + period`                 |
//! | All-or-nothing  | whole balance            | after deadline, goal met, not claimed  |

pub mod engine;
pub mod types;

#[cfg(test)]
mod props;

pub use engine::WithdrawalPolicyEngine;
pub use types::{DenialReason, Eligibility, WithdrawalRequest};
