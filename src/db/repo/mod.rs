//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `policies.rs` - Commission policy versions
//! - `snapshots.rs` - Snapshot computation and reads
//! - `workflow.rs` - Approval, rejection, and reversal transactions
//! - `ledger.rs` - Append-only ledger entries
//! - `payouts.rs` - Payout recording and links
//! - `disputes.rs` - Dispute lifecycle
//! - `locks.rs` - Period locks and the unlocked guard
//!
//! Every mutating operation runs as a single transaction and re-checks its
//! workflow guards (status, period lock, balances) inside that transaction,
//! so a concurrently created lock or competing payout is either seen or
//! serialized behind this writer.

mod disputes;
mod ledger;
mod locks;
mod payouts;
mod policies;
mod snapshots;
mod workflow;

use sqlx::sqlite::SqlitePool;
use std::str::FromStr;

use crate::domain::{
    CommissionAllocation, CommissionSnapshot, DealId, LedgerEntry, MinorAmount, Payout,
    PayoutAllocationLink, Role, SnapshotStatus,
};

/// Result of a snapshot computation: the snapshot, its four allocations, and
/// whether an existing open snapshot was reused instead of creating one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedSnapshot {
    pub snapshot: CommissionSnapshot,
    pub allocations: Vec<CommissionAllocation>,
    pub reused: bool,
}

/// Result of a reversal: the updated snapshot and the entries it posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReversalOutcome {
    pub snapshot: CommissionSnapshot,
    pub entries: Vec<LedgerEntry>,
}

/// One allocation belonging to `user` on an authoritative, settled snapshot.
/// Input rows for the per-user commission summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCommissionItem {
    pub deal_id: DealId,
    pub snapshot_id: i64,
    pub version: i64,
    pub status: SnapshotStatus,
    pub allocation_id: i64,
    pub role: Role,
    pub basis_points: u32,
    pub amount_minor: MinorAmount,
    pub paid_minor: MinorAmount,
    pub reversed_minor: MinorAmount,
}

impl UserCommissionItem {
    pub fn outstanding_minor(&self) -> MinorAmount {
        self.amount_minor - self.paid_minor - self.reversed_minor
    }
}

/// A payout link joined with its payout row, for the deal commission detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealPayoutLink {
    pub payout: Payout,
    pub link: PayoutAllocationLink,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

/// Decode a TEXT column into one of the closed domain enums. Corrupt rows
/// surface as decode errors instead of silently defaulting.
pub(crate) fn parse_enum<T>(raw: String, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
