//! Ledger balance reconciliation.

pub mod error;
pub mod reconciler;

pub use error::ReconcileError;
pub use reconciler::{
    DEFAULT_MILESTONE_CAPACITY, LedgerBalanceReconciler, Projection, ReconcilerSettings,
};
