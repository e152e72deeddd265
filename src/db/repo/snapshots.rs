//! Snapshot computation and read operations for the repository.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::info;

use super::{locks, parse_enum, policies, ComputedSnapshot, Repository};
use crate::domain::{
    CommissionAllocation, CommissionSnapshot, Currency, DealId, MinorAmount, Role,
    RoleBeneficiaries, SnapshotStatus, TimeMs, UserId,
};
use crate::engine::split_pool;
use crate::settlement::SettlementError;

impl Repository {
    /// Compute a new snapshot version for a deal, all inside one transaction:
    /// period-lock guard, effective-policy resolution, the idempotence check
    /// against an open snapshot with identical inputs, and the insertion of
    /// the DRAFT row, its promotion to PENDING_APPROVAL, and the four
    /// allocation rows.
    ///
    /// Concurrent computations for the same deal are serialized by the
    /// UNIQUE(deal_id, version) constraint; the losing writer gets a
    /// retryable storage error rather than a duplicate version.
    pub async fn compute_snapshot_tx(
        &self,
        deal_id: &DealId,
        pool_amount: MinorAmount,
        currency: &Currency,
        maker_id: &UserId,
        beneficiaries: &RoleBeneficiaries,
        now: TimeMs,
    ) -> Result<ComputedSnapshot, SettlementError> {
        let mut tx = self.pool.begin().await?;

        locks::assert_unlocked(&mut tx, now).await?;

        let policy = policies::effective_policy_conn(&mut tx, now)
            .await?
            .ok_or(SettlementError::NoActivePolicy(now))?;

        // Idempotence: identical inputs against a still-open snapshot return
        // that snapshot instead of minting a new version.
        if let Some(existing) =
            open_snapshot_with_inputs(&mut tx, deal_id, pool_amount, policy.id).await?
        {
            let allocations = allocations_for_snapshot_conn(&mut tx, existing.id).await?;
            tx.commit().await?;
            return Ok(ComputedSnapshot {
                snapshot: existing,
                allocations,
                reused: true,
            });
        }

        let last_version: Option<i64> =
            sqlx::query("SELECT MAX(version) AS v FROM commission_snapshots WHERE deal_id = ?")
                .bind(deal_id.as_str())
                .fetch_one(&mut *tx)
                .await?
                .get("v");
        let version = last_version.unwrap_or(0) + 1;

        let result = sqlx::query(
            r#"
            INSERT INTO commission_snapshots (
                deal_id, version, policy_id, pool_amount_minor, currency,
                status, maker_id, created_at_ms
            ) VALUES (?, ?, ?, ?, ?, 'DRAFT', ?, ?)
            "#,
        )
        .bind(deal_id.as_str())
        .bind(version)
        .bind(policy.id)
        .bind(pool_amount.as_i64())
        .bind(currency.as_str())
        .bind(maker_id.as_str())
        .bind(now.as_i64())
        .execute(&mut *tx)
        .await?;
        let snapshot_id = result.last_insert_rowid();

        // The DRAFT state never outlives this transaction; the snapshot is
        // submitted for approval in the same breath it is computed.
        sqlx::query("UPDATE commission_snapshots SET status = 'PENDING_APPROVAL' WHERE id = ?")
            .bind(snapshot_id)
            .execute(&mut *tx)
            .await?;

        let split = split_pool(pool_amount, policy.split_bps(), policy.rounding_rule);
        let mut allocations = Vec::with_capacity(4);
        for (role, amount) in split.iter() {
            let user_id = beneficiaries.for_role(role);
            let basis_points = policy.split_bps()[role.index()];
            let result = sqlx::query(
                r#"
                INSERT INTO commission_allocations (
                    snapshot_id, role, user_id, basis_points, amount_minor
                ) VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(snapshot_id)
            .bind(role.as_str())
            .bind(user_id.as_ref().map(|u| u.as_str().to_string()))
            .bind(basis_points)
            .bind(amount.as_i64())
            .execute(&mut *tx)
            .await?;

            allocations.push(CommissionAllocation {
                id: result.last_insert_rowid(),
                snapshot_id,
                role,
                user_id,
                basis_points,
                amount_minor: amount,
                paid_minor: MinorAmount::zero(),
                reversed_minor: MinorAmount::zero(),
            });
        }

        tx.commit().await?;

        info!(
            deal_id = %deal_id,
            snapshot_id,
            version,
            policy_id = policy.id,
            pool_amount = %pool_amount,
            "commission snapshot computed"
        );

        Ok(ComputedSnapshot {
            snapshot: CommissionSnapshot {
                id: snapshot_id,
                deal_id: deal_id.clone(),
                version,
                policy_id: policy.id,
                pool_amount_minor: pool_amount,
                currency: currency.clone(),
                status: SnapshotStatus::PendingApproval,
                maker_id: maker_id.clone(),
                approver_id: None,
                note: None,
                created_at: now,
                approved_at: None,
            },
            allocations,
            reused: false,
        })
    }

    /// Snapshot by id, outside any transaction.
    pub async fn get_snapshot(&self, id: i64) -> Result<Option<CommissionSnapshot>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        snapshot_by_id_conn(&mut conn, id).await
    }

    /// All snapshots for a deal, newest version first.
    pub async fn query_snapshots_for_deal(
        &self,
        deal_id: &DealId,
    ) -> Result<Vec<CommissionSnapshot>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "{SNAPSHOT_COLUMNS} WHERE deal_id = ? ORDER BY version DESC"
        ))
        .bind(deal_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snapshot_from_row).collect()
    }

    /// Allocations of one snapshot in role order.
    pub async fn query_allocations_for_snapshot(
        &self,
        snapshot_id: i64,
    ) -> Result<Vec<CommissionAllocation>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        allocations_for_snapshot_conn(&mut conn, snapshot_id).await
    }

    /// All PENDING_APPROVAL snapshots, oldest first, with maker identity.
    pub async fn query_pending_snapshots(&self) -> Result<Vec<CommissionSnapshot>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "{SNAPSHOT_COLUMNS} WHERE status = 'PENDING_APPROVAL' ORDER BY created_at_ms ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snapshot_from_row).collect()
    }

    /// Allocations owned by `user` on authoritative settled snapshots: per
    /// deal, the highest version whose money was actually posted.
    pub async fn query_user_commission_items(
        &self,
        user: &UserId,
    ) -> Result<Vec<super::UserCommissionItem>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT s.deal_id, s.id AS snapshot_id, s.version, s.status,
                   a.id AS allocation_id, a.role, a.basis_points,
                   a.amount_minor, a.paid_minor, a.reversed_minor
            FROM commission_allocations a
            JOIN commission_snapshots s ON s.id = a.snapshot_id
            WHERE a.user_id = ?
              AND s.status IN ('APPROVED', 'PARTIALLY_REVERSED', 'REVERSED')
              AND s.version = (
                  SELECT MAX(s2.version) FROM commission_snapshots s2
                  WHERE s2.deal_id = s.deal_id
                    AND s2.status IN ('APPROVED', 'PARTIALLY_REVERSED', 'REVERSED')
              )
            ORDER BY s.deal_id ASC, a.id ASC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(super::UserCommissionItem {
                    deal_id: DealId::new(row.get::<String, _>("deal_id")),
                    snapshot_id: row.get("snapshot_id"),
                    version: row.get("version"),
                    status: parse_enum(row.get("status"), "status")?,
                    allocation_id: row.get("allocation_id"),
                    role: parse_enum(row.get("role"), "role")?,
                    basis_points: row.get("basis_points"),
                    amount_minor: MinorAmount::new(row.get("amount_minor")),
                    paid_minor: MinorAmount::new(row.get("paid_minor")),
                    reversed_minor: MinorAmount::new(row.get("reversed_minor")),
                })
            })
            .collect()
    }
}

const SNAPSHOT_COLUMNS: &str = r#"
    SELECT id, deal_id, version, policy_id, pool_amount_minor, currency,
           status, maker_id, approver_id, note, created_at_ms, approved_at_ms
    FROM commission_snapshots
"#;

async fn open_snapshot_with_inputs(
    conn: &mut SqliteConnection,
    deal_id: &DealId,
    pool_amount: MinorAmount,
    policy_id: i64,
) -> Result<Option<CommissionSnapshot>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"{SNAPSHOT_COLUMNS}
        WHERE deal_id = ? AND pool_amount_minor = ? AND policy_id = ?
          AND status IN ('DRAFT', 'PENDING_APPROVAL')
        ORDER BY version DESC
        LIMIT 1
        "#
    ))
    .bind(deal_id.as_str())
    .bind(pool_amount.as_i64())
    .bind(policy_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(snapshot_from_row).transpose()
}

pub(super) async fn snapshot_by_id_conn(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<CommissionSnapshot>, sqlx::Error> {
    let row = sqlx::query(&format!("{SNAPSHOT_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(snapshot_from_row).transpose()
}

pub(super) async fn allocations_for_snapshot_conn(
    conn: &mut SqliteConnection,
    snapshot_id: i64,
) -> Result<Vec<CommissionAllocation>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, snapshot_id, role, user_id, basis_points,
               amount_minor, paid_minor, reversed_minor
        FROM commission_allocations
        WHERE snapshot_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(snapshot_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(allocation_from_row).collect()
}

pub(super) async fn allocation_by_id_conn(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<CommissionAllocation>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, snapshot_id, role, user_id, basis_points,
               amount_minor, paid_minor, reversed_minor
        FROM commission_allocations
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(allocation_from_row).transpose()
}

pub(super) fn snapshot_from_row(row: &SqliteRow) -> Result<CommissionSnapshot, sqlx::Error> {
    Ok(CommissionSnapshot {
        id: row.get("id"),
        deal_id: DealId::new(row.get::<String, _>("deal_id")),
        version: row.get("version"),
        policy_id: row.get("policy_id"),
        pool_amount_minor: MinorAmount::new(row.get("pool_amount_minor")),
        currency: Currency::new(row.get::<String, _>("currency")),
        status: parse_enum(row.get("status"), "status")?,
        maker_id: UserId::new(row.get::<String, _>("maker_id")),
        approver_id: row.get::<Option<String>, _>("approver_id").map(UserId::new),
        note: row.get("note"),
        created_at: TimeMs::new(row.get("created_at_ms")),
        approved_at: row.get::<Option<i64>, _>("approved_at_ms").map(TimeMs::new),
    })
}

pub(super) fn allocation_from_row(row: &SqliteRow) -> Result<CommissionAllocation, sqlx::Error> {
    Ok(CommissionAllocation {
        id: row.get("id"),
        snapshot_id: row.get("snapshot_id"),
        role: parse_enum::<Role>(row.get("role"), "role")?,
        user_id: row.get::<Option<String>, _>("user_id").map(UserId::new),
        basis_points: row.get("basis_points"),
        amount_minor: MinorAmount::new(row.get("amount_minor")),
        paid_minor: MinorAmount::new(row.get("paid_minor")),
        reversed_minor: MinorAmount::new(row.get("reversed_minor")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::{CalcMethod, NewPolicy, RoundingRule};
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

    async fn seed_policy(repo: &Repository) {
        let input = NewPolicy {
            name: "standard".to_string(),
            calc_method: CalcMethod::Percentage,
            commission_rate_bp: Some(400),
            fixed_commission_minor: None,
            currency: Currency::new("TRY"),
            hunter_bp: 3000,
            consultant_bp: 5000,
            broker_bp: 1500,
            system_bp: 500,
            rounding_rule: RoundingRule::RoundHalfUp,
            effective_from: TimeMs::new(0),
        };
        repo.insert_policy(&input, TimeMs::new(0)).await.unwrap();
    }

    fn beneficiaries() -> RoleBeneficiaries {
        RoleBeneficiaries {
            hunter: Some(UserId::new("hunter-1")),
            consultant: Some(UserId::new("consultant-1")),
            broker: Some(UserId::new("broker-1")),
        }
    }

    #[tokio::test]
    async fn test_compute_creates_pending_snapshot_with_balanced_allocations() {
        let (repo, _temp) = setup_test_db().await;
        seed_policy(&repo).await;

        let computed = repo
            .compute_snapshot_tx(
                &DealId::new("deal-1"),
                MinorAmount::new(1_000_001),
                &Currency::new("TRY"),
                &UserId::new("maker-1"),
                &beneficiaries(),
                TimeMs::new(1000),
            )
            .await
            .unwrap();

        assert!(!computed.reused);
        assert_eq!(computed.snapshot.version, 1);
        assert_eq!(computed.snapshot.status, SnapshotStatus::PendingApproval);
        assert_eq!(computed.allocations.len(), 4);

        let total: MinorAmount = computed
            .allocations
            .iter()
            .map(|a| a.amount_minor)
            .sum();
        assert_eq!(total, MinorAmount::new(1_000_001));

        // Rounding residue lands on SYSTEM.
        let system = computed
            .allocations
            .iter()
            .find(|a| a.role == Role::System)
            .unwrap();
        assert_eq!(system.amount_minor, MinorAmount::new(50_001));
        assert!(system.user_id.is_none());
    }

    #[tokio::test]
    async fn test_compute_is_idempotent_for_identical_inputs() {
        let (repo, _temp) = setup_test_db().await;
        seed_policy(&repo).await;

        let deal = DealId::new("deal-1");
        let first = repo
            .compute_snapshot_tx(
                &deal,
                MinorAmount::new(500_000),
                &Currency::new("TRY"),
                &UserId::new("maker-1"),
                &beneficiaries(),
                TimeMs::new(1000),
            )
            .await
            .unwrap();
        let second = repo
            .compute_snapshot_tx(
                &deal,
                MinorAmount::new(500_000),
                &Currency::new("TRY"),
                &UserId::new("maker-1"),
                &beneficiaries(),
                TimeMs::new(2000),
            )
            .await
            .unwrap();

        assert!(second.reused);
        assert_eq!(second.snapshot.id, first.snapshot.id);
        assert_eq!(second.snapshot.version, 1);
    }

    #[tokio::test]
    async fn test_compute_mints_new_version_for_different_pool() {
        let (repo, _temp) = setup_test_db().await;
        seed_policy(&repo).await;

        let deal = DealId::new("deal-1");
        repo.compute_snapshot_tx(
            &deal,
            MinorAmount::new(500_000),
            &Currency::new("TRY"),
            &UserId::new("maker-1"),
            &beneficiaries(),
            TimeMs::new(1000),
        )
        .await
        .unwrap();
        let second = repo
            .compute_snapshot_tx(
                &deal,
                MinorAmount::new(600_000),
                &Currency::new("TRY"),
                &UserId::new("maker-1"),
                &beneficiaries(),
                TimeMs::new(2000),
            )
            .await
            .unwrap();

        assert!(!second.reused);
        assert_eq!(second.snapshot.version, 2);
    }

    #[tokio::test]
    async fn test_compute_fails_without_effective_policy() {
        let (repo, _temp) = setup_test_db().await;

        let err = repo
            .compute_snapshot_tx(
                &DealId::new("deal-1"),
                MinorAmount::new(500_000),
                &Currency::new("TRY"),
                &UserId::new("maker-1"),
                &beneficiaries(),
                TimeMs::new(1000),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SettlementError::NoActivePolicy(_)));
    }
}
