//! Approval, rejection, and reversal transactions for the repository.

use sqlx::SqliteConnection;
use tracing::info;

use super::snapshots::{allocations_for_snapshot_conn, snapshot_by_id_conn};
use super::{ledger, locks, Repository, ReversalOutcome};
use crate::domain::{
    CommissionSnapshot, Direction, EntryType, MinorAmount, NewLedgerEntry, SnapshotStatus, TimeMs,
    UserId,
};
use crate::engine::distribute_proportional;
use crate::settlement::SettlementError;

impl Repository {
    /// Approve a PENDING_APPROVAL snapshot and post its allocation credit to
    /// the ledger, all in one transaction.
    pub async fn approve_snapshot_tx(
        &self,
        snapshot_id: i64,
        approver_id: &UserId,
        note: Option<&str>,
        now: TimeMs,
    ) -> Result<CommissionSnapshot, SettlementError> {
        let mut tx = self.pool.begin().await?;

        let snapshot = guarded_pending_snapshot(&mut tx, snapshot_id, approver_id, now).await?;

        sqlx::query(
            r#"
            UPDATE commission_snapshots
            SET status = 'APPROVED', approver_id = ?, approved_at_ms = ?, note = ?
            WHERE id = ?
            "#,
        )
        .bind(approver_id.as_str())
        .bind(now.as_i64())
        .bind(note)
        .bind(snapshot_id)
        .execute(&mut *tx)
        .await?;

        ledger::append_conn(
            &mut tx,
            NewLedgerEntry {
                deal_id: snapshot.deal_id.clone(),
                snapshot_id: Some(snapshot_id),
                entry_type: EntryType::Allocation,
                direction: Direction::Credit,
                amount_minor: snapshot.pool_amount_minor,
                occurred_at: now,
                memo: format!(
                    "commission allocation for deal {} snapshot v{}",
                    snapshot.deal_id, snapshot.version
                ),
                actor_id: approver_id.clone(),
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            snapshot_id,
            deal_id = %snapshot.deal_id,
            approver = %approver_id,
            "commission snapshot approved"
        );

        Ok(CommissionSnapshot {
            status: SnapshotStatus::Approved,
            approver_id: Some(approver_id.clone()),
            approved_at: Some(now),
            note: note.map(|s| s.to_string()),
            ..snapshot
        })
    }

    /// Reject a PENDING_APPROVAL snapshot. Same guards as approval; no
    /// ledger entry is posted for a rejected snapshot.
    pub async fn reject_snapshot_tx(
        &self,
        snapshot_id: i64,
        approver_id: &UserId,
        note: Option<&str>,
        now: TimeMs,
    ) -> Result<CommissionSnapshot, SettlementError> {
        let mut tx = self.pool.begin().await?;

        let snapshot = guarded_pending_snapshot(&mut tx, snapshot_id, approver_id, now).await?;

        sqlx::query(
            r#"
            UPDATE commission_snapshots
            SET status = 'REJECTED', approver_id = ?, note = ?
            WHERE id = ?
            "#,
        )
        .bind(approver_id.as_str())
        .bind(note)
        .bind(snapshot_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            snapshot_id,
            deal_id = %snapshot.deal_id,
            approver = %approver_id,
            "commission snapshot rejected"
        );

        Ok(CommissionSnapshot {
            status: SnapshotStatus::Rejected,
            approver_id: Some(approver_id.clone()),
            note: note.map(|s| s.to_string()),
            ..snapshot
        })
    }

    /// Reverse all or part of an approved snapshot's outstanding balance.
    ///
    /// The requested amount (or, when omitted, the full outstanding) is
    /// distributed proportionally over the allocations' current outstanding
    /// balances, read inside this transaction so concurrent payouts cannot
    /// race the distribution.
    pub async fn reverse_snapshot_tx(
        &self,
        snapshot_id: i64,
        actor_id: &UserId,
        reason: &str,
        amount: Option<MinorAmount>,
        now: TimeMs,
    ) -> Result<ReversalOutcome, SettlementError> {
        let mut tx = self.pool.begin().await?;

        let snapshot = snapshot_by_id_conn(&mut tx, snapshot_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("snapshot {snapshot_id}")))?;

        if !snapshot.status.is_reversible() {
            return Err(SettlementError::InvalidState(format!(
                "snapshot {snapshot_id} is {}; only APPROVED or PARTIALLY_REVERSED snapshots can be reversed",
                snapshot.status
            )));
        }

        locks::assert_unlocked(&mut tx, now).await?;

        let allocations = allocations_for_snapshot_conn(&mut tx, snapshot_id).await?;
        let mut outstanding = [MinorAmount::zero(); 4];
        for alloc in &allocations {
            outstanding[alloc.role.index()] = alloc.outstanding_minor();
        }
        let total_outstanding: MinorAmount = outstanding.iter().copied().sum();

        let requested = amount.unwrap_or(total_outstanding);
        if requested > total_outstanding {
            return Err(SettlementError::Overreversal {
                snapshot_id,
                requested,
                outstanding: total_outstanding,
            });
        }

        let shares = distribute_proportional(requested, outstanding);
        let mut entries = Vec::new();
        for alloc in &allocations {
            let share = shares.get(alloc.role);
            if share.is_zero() {
                continue;
            }

            sqlx::query(
                "UPDATE commission_allocations SET reversed_minor = reversed_minor + ? WHERE id = ?",
            )
            .bind(share.as_i64())
            .bind(alloc.id)
            .execute(&mut *tx)
            .await?;

            let entry = ledger::append_conn(
                &mut tx,
                NewLedgerEntry {
                    deal_id: snapshot.deal_id.clone(),
                    snapshot_id: Some(snapshot_id),
                    entry_type: EntryType::Reversal,
                    direction: Direction::Debit,
                    amount_minor: share,
                    occurred_at: now,
                    memo: reason.to_string(),
                    actor_id: actor_id.clone(),
                },
            )
            .await?;
            entries.push(entry);
        }

        let new_status = if total_outstanding - requested == MinorAmount::zero() {
            SnapshotStatus::Reversed
        } else {
            SnapshotStatus::PartiallyReversed
        };

        sqlx::query("UPDATE commission_snapshots SET status = ? WHERE id = ?")
            .bind(new_status.as_str())
            .bind(snapshot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            snapshot_id,
            deal_id = %snapshot.deal_id,
            requested = %requested,
            status = %new_status,
            "commission reversal posted"
        );

        Ok(ReversalOutcome {
            snapshot: CommissionSnapshot {
                status: new_status,
                ..snapshot
            },
            entries,
        })
    }
}

/// Shared maker-checker guards: the snapshot exists, the reviewer is not its
/// maker, no active lock covers now, and the snapshot is awaiting review.
async fn guarded_pending_snapshot(
    conn: &mut SqliteConnection,
    snapshot_id: i64,
    approver_id: &UserId,
    now: TimeMs,
) -> Result<CommissionSnapshot, SettlementError> {
    let snapshot = snapshot_by_id_conn(conn, snapshot_id)
        .await?
        .ok_or_else(|| SettlementError::NotFound(format!("snapshot {snapshot_id}")))?;

    if snapshot.maker_id == *approver_id {
        return Err(SettlementError::SelfApproval(approver_id.clone()));
    }

    locks::assert_unlocked(conn, now).await?;

    if snapshot.status != SnapshotStatus::PendingApproval {
        return Err(SettlementError::InvalidState(format!(
            "snapshot {snapshot_id} is {}; expected PENDING_APPROVAL",
            snapshot.status
        )));
    }

    Ok(snapshot)
}
