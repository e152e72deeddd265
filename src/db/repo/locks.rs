//! Period lock operations and the unlocked guard.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::info;

use super::Repository;
use crate::domain::{PeriodLock, TimeMs, UserId};
use crate::settlement::SettlementError;

impl Repository {
    /// Create an active lock over [from, to], refusing any overlap with
    /// another active lock. The overlap check and the insert share one
    /// transaction so two concurrent creations cannot both pass.
    pub async fn create_lock_tx(
        &self,
        from: TimeMs,
        to: TimeMs,
        reason: &str,
        created_by: &UserId,
        now: TimeMs,
    ) -> Result<PeriodLock, SettlementError> {
        let mut tx = self.pool.begin().await?;

        let overlapping = sqlx::query(
            r#"
            SELECT id FROM period_locks
            WHERE is_active = 1 AND period_from_ms <= ? AND period_to_ms >= ?
            LIMIT 1
            "#,
        )
        .bind(to.as_i64())
        .bind(from.as_i64())
        .fetch_optional(&mut *tx)
        .await?;

        if overlapping.is_some() {
            return Err(SettlementError::OverlappingLock { from, to });
        }

        let result = sqlx::query(
            r#"
            INSERT INTO period_locks (period_from_ms, period_to_ms, reason, is_active, created_by, created_at_ms)
            VALUES (?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(from.as_i64())
        .bind(to.as_i64())
        .bind(reason)
        .bind(created_by.as_str())
        .bind(now.as_i64())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(lock_id = result.last_insert_rowid(), %from, %to, "period lock created");

        Ok(PeriodLock {
            id: result.last_insert_rowid(),
            period_from: from,
            period_to: to,
            reason: reason.to_string(),
            is_active: true,
            created_by: created_by.clone(),
            created_at: now,
            unlocked_at: None,
            unlocked_by: None,
        })
    }

    /// Release an active lock.
    pub async fn release_lock_tx(
        &self,
        lock_id: i64,
        released_by: &UserId,
        now: TimeMs,
    ) -> Result<PeriodLock, SettlementError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("{LOCK_COLUMNS} WHERE id = ?"))
            .bind(lock_id)
            .fetch_optional(&mut *tx)
            .await?;
        let lock = row
            .as_ref()
            .map(lock_from_row)
            .transpose()?
            .ok_or_else(|| SettlementError::NotFound(format!("period lock {lock_id}")))?;

        if !lock.is_active {
            return Err(SettlementError::InvalidState(format!(
                "period lock {lock_id} is already released"
            )));
        }

        sqlx::query(
            "UPDATE period_locks SET is_active = 0, unlocked_at_ms = ?, unlocked_by = ? WHERE id = ?",
        )
        .bind(now.as_i64())
        .bind(released_by.as_str())
        .bind(lock_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(lock_id, released_by = %released_by, "period lock released");

        Ok(PeriodLock {
            is_active: false,
            unlocked_at: Some(now),
            unlocked_by: Some(released_by.clone()),
            ..lock
        })
    }

    /// All locks, newest first.
    pub async fn query_locks(&self) -> Result<Vec<PeriodLock>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "{LOCK_COLUMNS} ORDER BY created_at_ms DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(lock_from_row).collect()
    }
}

/// Refuse to proceed while an active lock covers `at`.
///
/// Runs on the caller's open transaction, never against a cached read, so a
/// lock committed before this mutation is always seen.
pub(super) async fn assert_unlocked(
    conn: &mut SqliteConnection,
    at: TimeMs,
) -> Result<(), SettlementError> {
    let row = sqlx::query(
        r#"
        SELECT id, reason FROM period_locks
        WHERE is_active = 1 AND period_from_ms <= ? AND period_to_ms >= ?
        LIMIT 1
        "#,
    )
    .bind(at.as_i64())
    .bind(at.as_i64())
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Err(SettlementError::PeriodLocked {
            lock_id: row.get("id"),
            reason: row.get("reason"),
        }),
        None => Ok(()),
    }
}

const LOCK_COLUMNS: &str = r#"
    SELECT id, period_from_ms, period_to_ms, reason, is_active,
           created_by, created_at_ms, unlocked_at_ms, unlocked_by
    FROM period_locks
"#;

fn lock_from_row(row: &SqliteRow) -> Result<PeriodLock, sqlx::Error> {
    Ok(PeriodLock {
        id: row.get("id"),
        period_from: TimeMs::new(row.get("period_from_ms")),
        period_to: TimeMs::new(row.get("period_to_ms")),
        reason: row.get("reason"),
        is_active: row.get::<i64, _>("is_active") != 0,
        created_by: UserId::new(row.get::<String, _>("created_by")),
        created_at: TimeMs::new(row.get("created_at_ms")),
        unlocked_at: row.get::<Option<i64>, _>("unlocked_at_ms").map(TimeMs::new),
        unlocked_by: row.get::<Option<String>, _>("unlocked_by").map(UserId::new),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_release() {
        let (repo, _temp) = setup_test_db().await;
        let admin = UserId::new("admin");

        let lock = repo
            .create_lock_tx(TimeMs::new(100), TimeMs::new(200), "month close", &admin, TimeMs::new(50))
            .await
            .unwrap();
        assert!(lock.is_active);

        let released = repo
            .release_lock_tx(lock.id, &admin, TimeMs::new(300))
            .await
            .unwrap();
        assert!(!released.is_active);
        assert_eq!(released.unlocked_at, Some(TimeMs::new(300)));

        let err = repo
            .release_lock_tx(lock.id, &admin, TimeMs::new(400))
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_overlapping_active_lock_rejected() {
        let (repo, _temp) = setup_test_db().await;
        let admin = UserId::new("admin");

        repo.create_lock_tx(TimeMs::new(100), TimeMs::new(200), "q1", &admin, TimeMs::new(0))
            .await
            .unwrap();

        // Touching endpoints count as overlap: intervals are inclusive.
        let err = repo
            .create_lock_tx(TimeMs::new(200), TimeMs::new(300), "q2", &admin, TimeMs::new(0))
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::OverlappingLock { .. }));

        // Disjoint interval is fine.
        repo.create_lock_tx(TimeMs::new(201), TimeMs::new(300), "q2", &admin, TimeMs::new(0))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_released_lock_no_longer_blocks_overlap() {
        let (repo, _temp) = setup_test_db().await;
        let admin = UserId::new("admin");

        let lock = repo
            .create_lock_tx(TimeMs::new(100), TimeMs::new(200), "q1", &admin, TimeMs::new(0))
            .await
            .unwrap();
        repo.release_lock_tx(lock.id, &admin, TimeMs::new(10))
            .await
            .unwrap();

        repo.create_lock_tx(TimeMs::new(150), TimeMs::new(250), "redo", &admin, TimeMs::new(20))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_assert_unlocked_guard() {
        let (repo, _temp) = setup_test_db().await;
        let admin = UserId::new("admin");

        repo.create_lock_tx(TimeMs::new(100), TimeMs::new(200), "freeze", &admin, TimeMs::new(0))
            .await
            .unwrap();

        let mut conn = repo.pool.acquire().await.unwrap();
        assert!(assert_unlocked(&mut conn, TimeMs::new(150)).await.is_err());
        assert!(assert_unlocked(&mut conn, TimeMs::new(100)).await.is_err());
        assert!(assert_unlocked(&mut conn, TimeMs::new(200)).await.is_err());
        assert!(assert_unlocked(&mut conn, TimeMs::new(99)).await.is_ok());
        assert!(assert_unlocked(&mut conn, TimeMs::new(201)).await.is_ok());
    }
}
