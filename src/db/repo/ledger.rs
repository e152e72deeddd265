//! Append-only ledger operations for the repository.
//!
//! `append_conn` is the only write path; no update or delete statement for
//! `ledger_entries` exists anywhere in the crate.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{parse_enum, Repository};
use crate::domain::{DealId, LedgerEntry, MinorAmount, NewLedgerEntry, TimeMs, UserId};

impl Repository {
    /// Ledger entries of one deal in occurrence order.
    pub async fn query_ledger_for_deal(
        &self,
        deal_id: &DealId,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, deal_id, snapshot_id, entry_type, direction,
                   amount_minor, occurred_at_ms, memo, actor_id
            FROM ledger_entries
            WHERE deal_id = ?
            ORDER BY occurred_at_ms ASC, id ASC
            "#,
        )
        .bind(deal_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }
}

/// Append one entry inside an open transaction and return it with its id.
pub(super) async fn append_conn(
    conn: &mut SqliteConnection,
    entry: NewLedgerEntry,
) -> Result<LedgerEntry, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO ledger_entries (
            deal_id, snapshot_id, entry_type, direction,
            amount_minor, occurred_at_ms, memo, actor_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.deal_id.as_str())
    .bind(entry.snapshot_id)
    .bind(entry.entry_type.as_str())
    .bind(entry.direction.as_str())
    .bind(entry.amount_minor.as_i64())
    .bind(entry.occurred_at.as_i64())
    .bind(&entry.memo)
    .bind(entry.actor_id.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(LedgerEntry {
        id: result.last_insert_rowid(),
        deal_id: entry.deal_id,
        snapshot_id: entry.snapshot_id,
        entry_type: entry.entry_type,
        direction: entry.direction,
        amount_minor: entry.amount_minor,
        occurred_at: entry.occurred_at,
        memo: entry.memo,
        actor_id: entry.actor_id,
    })
}

pub(super) fn entry_from_row(row: &SqliteRow) -> Result<LedgerEntry, sqlx::Error> {
    Ok(LedgerEntry {
        id: row.get("id"),
        deal_id: DealId::new(row.get::<String, _>("deal_id")),
        snapshot_id: row.get("snapshot_id"),
        entry_type: parse_enum(row.get("entry_type"), "entry_type")?,
        direction: parse_enum(row.get("direction"), "direction")?,
        amount_minor: MinorAmount::new(row.get("amount_minor")),
        occurred_at: TimeMs::new(row.get("occurred_at_ms")),
        memo: row.get("memo"),
        actor_id: UserId::new(row.get::<String, _>("actor_id")),
    })
}
