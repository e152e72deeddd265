//! Dispute lifecycle operations for the repository.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;

use super::{parse_enum, Repository};
use crate::domain::{DealId, Dispute, DisputeStatus, DisputeType, TimeMs, UserId};
use crate::settlement::SettlementError;

impl Repository {
    /// Open a new dispute with its SLA deadline already computed.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_dispute(
        &self,
        deal_id: &DealId,
        snapshot_id: Option<i64>,
        opener_id: &UserId,
        against_user_id: Option<&UserId>,
        dispute_type: DisputeType,
        note: Option<&str>,
        sla_due_at: TimeMs,
        now: TimeMs,
    ) -> Result<Dispute, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO disputes (
                deal_id, snapshot_id, opener_id, against_user_id,
                dispute_type, status, sla_due_at_ms, created_at_ms, note
            ) VALUES (?, ?, ?, ?, ?, 'OPEN', ?, ?, ?)
            "#,
        )
        .bind(deal_id.as_str())
        .bind(snapshot_id)
        .bind(opener_id.as_str())
        .bind(against_user_id.map(|u| u.as_str().to_string()))
        .bind(dispute_type.as_str())
        .bind(sla_due_at.as_i64())
        .bind(now.as_i64())
        .bind(note)
        .execute(&self.pool)
        .await?;

        Ok(Dispute {
            id: result.last_insert_rowid(),
            deal_id: deal_id.clone(),
            snapshot_id,
            opener_id: opener_id.clone(),
            against_user_id: against_user_id.cloned(),
            dispute_type,
            status: DisputeStatus::Open,
            sla_due_at,
            created_at: now,
            note: note.map(|s| s.to_string()),
            resolution_note: None,
        })
    }

    /// Move a dispute along one of the allowed workflow edges. The current
    /// status is re-read inside the transaction so concurrent transitions
    /// serialize instead of both applying.
    pub async fn set_dispute_status_tx(
        &self,
        dispute_id: i64,
        new_status: DisputeStatus,
        note: Option<&str>,
    ) -> Result<Dispute, SettlementError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(DISPUTE_SELECT_BY_ID)
            .bind(dispute_id)
            .fetch_optional(&mut *tx)
            .await?;
        let dispute = row
            .as_ref()
            .map(dispute_from_row)
            .transpose()?
            .ok_or_else(|| SettlementError::NotFound(format!("dispute {dispute_id}")))?;

        if !dispute.status.can_transition_to(new_status) {
            return Err(SettlementError::InvalidTransition {
                from: dispute.status,
                to: new_status,
            });
        }

        sqlx::query(
            r#"
            UPDATE disputes
            SET status = ?, resolution_note = COALESCE(?, resolution_note)
            WHERE id = ?
            "#,
        )
        .bind(new_status.as_str())
        .bind(note)
        .bind(dispute_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            dispute_id,
            from = %dispute.status,
            to = %new_status,
            "dispute transitioned"
        );

        Ok(Dispute {
            status: new_status,
            resolution_note: note.map(|s| s.to_string()).or(dispute.resolution_note.clone()),
            ..dispute
        })
    }

    /// Escalate every OPEN / UNDER_REVIEW dispute whose SLA deadline has
    /// passed. A single conditional UPDATE, so repeated and concurrent
    /// invocations are idempotent: already-ESCALATED disputes never match.
    pub async fn escalate_overdue_disputes(&self, now: TimeMs) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE disputes
            SET status = 'ESCALATED'
            WHERE status IN ('OPEN', 'UNDER_REVIEW') AND sla_due_at_ms <= ?
            "#,
        )
        .bind(now.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn get_dispute(&self, id: i64) -> Result<Option<Dispute>, sqlx::Error> {
        let row = sqlx::query(DISPUTE_SELECT_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(dispute_from_row).transpose()
    }
}

const DISPUTE_SELECT_BY_ID: &str = r#"
    SELECT id, deal_id, snapshot_id, opener_id, against_user_id,
           dispute_type, status, sla_due_at_ms, created_at_ms, note, resolution_note
    FROM disputes
    WHERE id = ?
"#;

fn dispute_from_row(row: &SqliteRow) -> Result<Dispute, sqlx::Error> {
    Ok(Dispute {
        id: row.get("id"),
        deal_id: DealId::new(row.get::<String, _>("deal_id")),
        snapshot_id: row.get("snapshot_id"),
        opener_id: UserId::new(row.get::<String, _>("opener_id")),
        against_user_id: row
            .get::<Option<String>, _>("against_user_id")
            .map(UserId::new),
        dispute_type: parse_enum(row.get("dispute_type"), "dispute_type")?,
        status: parse_enum(row.get("status"), "status")?,
        sla_due_at: TimeMs::new(row.get("sla_due_at_ms")),
        created_at: TimeMs::new(row.get("created_at_ms")),
        note: row.get("note"),
        resolution_note: row.get("resolution_note"),
    })
}
