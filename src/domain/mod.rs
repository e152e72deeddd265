//! Domain types for the commission allocation & settlement ledger.
//!
//! This module provides:
//! - Integer minor-unit money (never floating point)
//! - Domain primitives: TimeMs, DealId, UserId, Currency
//! - Versioned commission policies and basis-point splits
//! - Snapshots, allocations, ledger entries, payouts, disputes, period locks

pub mod dispute;
pub mod ledger;
pub mod lock;
pub mod money;
pub mod payout;
pub mod policy;
pub mod primitives;
pub mod snapshot;

pub use dispute::{Dispute, DisputeStatus, DisputeType};
pub use ledger::{Direction, EntryType, LedgerEntry, NewLedgerEntry};
pub use lock::PeriodLock;
pub use money::MinorAmount;
pub use payout::{Payout, PayoutAllocationLink, PayoutMethod};
pub use policy::{CalcMethod, CommissionPolicy, NewPolicy, RoundingRule, FULL_SPLIT_BP};
pub use primitives::{Currency, DealId, TimeMs, UserId};
pub use snapshot::{
    CommissionAllocation, CommissionSnapshot, Role, RoleBeneficiaries, SnapshotStatus,
};
