//! Core withdrawal logic for Fundrelease.
//!
//! This crate decides whether pooled campaign funds may be released, submits
//! releases to the external ledger one at a time per campaign, and keeps a
//! local projection of ledger state in step. It has no web dependencies; the
//! ledger and the exchange-rate oracle are reached through traits.
//!
//! # Modules
//!
//! - `currency` - Native/display conversion and the exchange-rate book
//! - `campaign` - Campaign and milestone projection types
//! - `policy` - Per-type withdrawal eligibility rules
//! - `ledger` - External ledger port and the in-memory ledger
//! - `reconcile` - Projection refresh and staleness tracking
//! - `coordinator` - Serialized submission and confirmation handling
//! - `engine` - Display-currency facade over the above

pub mod campaign;
pub mod clock;
pub mod coordinator;
pub mod currency;
pub mod engine;
pub mod ledger;
pub mod policy;
pub mod reconcile;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{EngineSettings, Evaluation, WithdrawalEngine};
