//! Payout recording and link queries for the repository.

use std::collections::BTreeMap;

use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use super::snapshots::{allocation_by_id_conn, snapshot_by_id_conn};
use super::{ledger, locks, parse_enum, DealPayoutLink, Repository};
use crate::domain::{
    DealId, Direction, EntryType, MinorAmount, NewLedgerEntry, Payout, PayoutAllocationLink,
    PayoutMethod, TimeMs, UserId,
};
use crate::settlement::SettlementError;

impl Repository {
    /// Record one payout against one or more allocations, atomically.
    ///
    /// Every link is checked against the allocation's outstanding balance as
    /// read inside this transaction; a single failing link aborts the whole
    /// payout. One PAYOUT debit is posted per distinct snapshot touched.
    pub async fn record_payout_tx(
        &self,
        paid_at: TimeMs,
        method: PayoutMethod,
        reference_no: Option<&str>,
        links: &[(i64, MinorAmount)],
        created_by: &UserId,
        now: TimeMs,
    ) -> Result<(Payout, Vec<PayoutAllocationLink>), SettlementError> {
        let mut tx = self.pool.begin().await?;

        locks::assert_unlocked(&mut tx, paid_at).await?;

        let payout_key = Uuid::new_v4().to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO payouts (payout_key, paid_at_ms, method, reference_no, created_by, created_at_ms)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&payout_key)
        .bind(paid_at.as_i64())
        .bind(method.as_str())
        .bind(reference_no)
        .bind(created_by.as_str())
        .bind(now.as_i64())
        .execute(&mut *tx)
        .await?;
        let payout_id = result.last_insert_rowid();

        // Per-snapshot totals for the ledger debits, keyed in insertion
        // order for deterministic entry ids.
        let mut per_snapshot: BTreeMap<i64, (DealId, MinorAmount)> = BTreeMap::new();
        let mut out_links = Vec::with_capacity(links.len());

        for &(allocation_id, amount) in links {
            let alloc = allocation_by_id_conn(&mut tx, allocation_id)
                .await?
                .ok_or_else(|| {
                    SettlementError::NotFound(format!("allocation {allocation_id}"))
                })?;
            let snapshot = snapshot_by_id_conn(&mut tx, alloc.snapshot_id)
                .await?
                .ok_or_else(|| {
                    SettlementError::NotFound(format!("snapshot {}", alloc.snapshot_id))
                })?;

            if !snapshot.status.is_reversible() {
                return Err(SettlementError::InvalidState(format!(
                    "snapshot {} is {}; payouts apply only to approved snapshots",
                    snapshot.id, snapshot.status
                )));
            }

            let outstanding = alloc.outstanding_minor();
            if amount > outstanding {
                return Err(SettlementError::Overpayment {
                    allocation_id,
                    requested: amount,
                    outstanding,
                });
            }

            sqlx::query(
                "UPDATE commission_allocations SET paid_minor = paid_minor + ? WHERE id = ?",
            )
            .bind(amount.as_i64())
            .bind(allocation_id)
            .execute(&mut *tx)
            .await?;

            let link_result = sqlx::query(
                r#"
                INSERT INTO payout_allocation_links (payout_id, allocation_id, amount_minor)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(payout_id)
            .bind(allocation_id)
            .bind(amount.as_i64())
            .execute(&mut *tx)
            .await?;

            out_links.push(PayoutAllocationLink {
                id: link_result.last_insert_rowid(),
                payout_id,
                allocation_id,
                amount_minor: amount,
            });

            let slot = per_snapshot
                .entry(snapshot.id)
                .or_insert_with(|| (snapshot.deal_id.clone(), MinorAmount::zero()));
            slot.1 += amount;
        }

        for (snapshot_id, (deal_id, total)) in &per_snapshot {
            ledger::append_conn(
                &mut tx,
                NewLedgerEntry {
                    deal_id: deal_id.clone(),
                    snapshot_id: Some(*snapshot_id),
                    entry_type: EntryType::Payout,
                    direction: Direction::Debit,
                    amount_minor: *total,
                    occurred_at: paid_at,
                    memo: format!("payout {payout_key}"),
                    actor_id: created_by.clone(),
                },
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            payout_key = %payout_key,
            links = out_links.len(),
            method = %method,
            "payout recorded"
        );

        Ok((
            Payout {
                id: payout_id,
                payout_key,
                paid_at,
                method,
                reference_no: reference_no.map(|s| s.to_string()),
                created_by: created_by.clone(),
                created_at: now,
            },
            out_links,
        ))
    }

    /// All payout links touching a deal's allocations, with their payouts.
    pub async fn query_payout_links_for_deal(
        &self,
        deal_id: &DealId,
    ) -> Result<Vec<DealPayoutLink>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT p.id AS payout_id, p.payout_key, p.paid_at_ms, p.method,
                   p.reference_no, p.created_by, p.created_at_ms,
                   l.id AS link_id, l.allocation_id, l.amount_minor
            FROM payout_allocation_links l
            JOIN payouts p ON p.id = l.payout_id
            JOIN commission_allocations a ON a.id = l.allocation_id
            JOIN commission_snapshots s ON s.id = a.snapshot_id
            WHERE s.deal_id = ?
            ORDER BY p.id ASC, l.id ASC
            "#,
        )
        .bind(deal_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DealPayoutLink {
                    payout: Payout {
                        id: row.get("payout_id"),
                        payout_key: row.get("payout_key"),
                        paid_at: TimeMs::new(row.get("paid_at_ms")),
                        method: parse_enum::<PayoutMethod>(row.get("method"), "method")?,
                        reference_no: row.get("reference_no"),
                        created_by: UserId::new(row.get::<String, _>("created_by")),
                        created_at: TimeMs::new(row.get("created_at_ms")),
                    },
                    link: PayoutAllocationLink {
                        id: row.get("link_id"),
                        payout_id: row.get("payout_id"),
                        allocation_id: row.get("allocation_id"),
                        amount_minor: MinorAmount::new(row.get("amount_minor")),
                    },
                })
            })
            .collect()
    }
}
