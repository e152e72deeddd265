//! Commission policy operations for the repository.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{parse_enum, Repository};
use crate::domain::{CommissionPolicy, Currency, MinorAmount, NewPolicy, TimeMs};

impl Repository {
    /// Insert a new immutable policy version. The caller (PolicyStore) has
    /// already validated the split and calc-method fields.
    pub async fn insert_policy(
        &self,
        input: &NewPolicy,
        now: TimeMs,
    ) -> Result<CommissionPolicy, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO commission_policies (
                name, calc_method, commission_rate_bp, fixed_commission_minor,
                currency, hunter_bp, consultant_bp, broker_bp, system_bp,
                rounding_rule, effective_from_ms, created_at_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.name)
        .bind(input.calc_method.as_str())
        .bind(input.commission_rate_bp)
        .bind(input.fixed_commission_minor.map(|a| a.as_i64()))
        .bind(input.currency.as_str())
        .bind(input.hunter_bp)
        .bind(input.consultant_bp)
        .bind(input.broker_bp)
        .bind(input.system_bp)
        .bind(input.rounding_rule.as_str())
        .bind(input.effective_from.as_i64())
        .bind(now.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(CommissionPolicy {
            id: result.last_insert_rowid(),
            name: input.name.clone(),
            calc_method: input.calc_method,
            commission_rate_bp: input.commission_rate_bp,
            fixed_commission_minor: input.fixed_commission_minor,
            currency: input.currency.clone(),
            hunter_bp: input.hunter_bp,
            consultant_bp: input.consultant_bp,
            broker_bp: input.broker_bp,
            system_bp: input.system_bp,
            rounding_rule: input.rounding_rule,
            effective_from: input.effective_from,
            created_at: now,
        })
    }

    /// The policy with the latest `effective_from <= at`, if any.
    pub async fn find_effective_policy(
        &self,
        at: TimeMs,
    ) -> Result<Option<CommissionPolicy>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        effective_policy_conn(&mut conn, at).await
    }

    /// All policy versions, newest effective first.
    pub async fn query_policies(&self) -> Result<Vec<CommissionPolicy>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, calc_method, commission_rate_bp, fixed_commission_minor,
                   currency, hunter_bp, consultant_bp, broker_bp, system_bp,
                   rounding_rule, effective_from_ms, created_at_ms
            FROM commission_policies
            ORDER BY effective_from_ms DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(policy_from_row).collect()
    }
}

/// Resolve the effective policy inside an open transaction.
pub(super) async fn effective_policy_conn(
    conn: &mut SqliteConnection,
    at: TimeMs,
) -> Result<Option<CommissionPolicy>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, name, calc_method, commission_rate_bp, fixed_commission_minor,
               currency, hunter_bp, consultant_bp, broker_bp, system_bp,
               rounding_rule, effective_from_ms, created_at_ms
        FROM commission_policies
        WHERE effective_from_ms <= ?
        ORDER BY effective_from_ms DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(at.as_i64())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(policy_from_row).transpose()
}

pub(super) fn policy_from_row(row: &SqliteRow) -> Result<CommissionPolicy, sqlx::Error> {
    Ok(CommissionPolicy {
        id: row.get("id"),
        name: row.get("name"),
        calc_method: parse_enum(row.get("calc_method"), "calc_method")?,
        commission_rate_bp: row.get("commission_rate_bp"),
        fixed_commission_minor: row
            .get::<Option<i64>, _>("fixed_commission_minor")
            .map(MinorAmount::new),
        currency: Currency::new(row.get::<String, _>("currency")),
        hunter_bp: row.get("hunter_bp"),
        consultant_bp: row.get("consultant_bp"),
        broker_bp: row.get("broker_bp"),
        system_bp: row.get("system_bp"),
        rounding_rule: parse_enum(row.get("rounding_rule"), "rounding_rule")?,
        effective_from: TimeMs::new(row.get("effective_from_ms")),
        created_at: TimeMs::new(row.get("created_at_ms")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::{CalcMethod, RoundingRule};
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

    fn percentage_policy(effective_from: i64) -> NewPolicy {
        NewPolicy {
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
            effective_from: TimeMs::new(effective_from),
        }
    }

    #[tokio::test]
    async fn test_insert_and_resolve_effective() {
        let (repo, _temp) = setup_test_db().await;

        let v1 = repo
            .insert_policy(&percentage_policy(1000), TimeMs::new(1))
            .await
            .unwrap();
        let v2 = repo
            .insert_policy(&percentage_policy(5000), TimeMs::new(2))
            .await
            .unwrap();

        // Before the second version takes effect, the first wins.
        let at_3000 = repo.find_effective_policy(TimeMs::new(3000)).await.unwrap();
        assert_eq!(at_3000.unwrap().id, v1.id);

        // At and after its effective_from, the newer version wins.
        let at_5000 = repo.find_effective_policy(TimeMs::new(5000)).await.unwrap();
        assert_eq!(at_5000.unwrap().id, v2.id);
    }

    #[tokio::test]
    async fn test_no_policy_before_first_effective() {
        let (repo, _temp) = setup_test_db().await;

        repo.insert_policy(&percentage_policy(1000), TimeMs::new(1))
            .await
            .unwrap();

        let none = repo.find_effective_policy(TimeMs::new(999)).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_query_policies_newest_first() {
        let (repo, _temp) = setup_test_db().await;

        repo.insert_policy(&percentage_policy(1000), TimeMs::new(1))
            .await
            .unwrap();
        repo.insert_policy(&percentage_policy(5000), TimeMs::new(2))
            .await
            .unwrap();

        let policies = repo.query_policies().await.unwrap();
        assert_eq!(policies.len(), 2);
        assert_eq!(policies[0].effective_from, TimeMs::new(5000));
        assert_eq!(policies[1].effective_from, TimeMs::new(1000));
    }
}
