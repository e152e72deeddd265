//! Versioned policy store with split validation.

use std::sync::Arc;
use tracing::info;

use super::SettlementError;
use crate::db::Repository;
use crate::domain::{CalcMethod, CommissionPolicy, NewPolicy, TimeMs, FULL_SPLIT_BP};

/// Holds versioned commission policies and resolves the one effective at a
/// point in time. Rows are immutable; an upsert always inserts.
#[derive(Clone)]
pub struct PolicyStore {
    repo: Arc<Repository>,
}

impl PolicyStore {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Validate and persist a new policy version. Nothing is written when
    /// validation fails.
    pub async fn upsert(&self, input: NewPolicy) -> Result<CommissionPolicy, SettlementError> {
        validate(&input)?;

        let policy = self.repo.insert_policy(&input, TimeMs::now()).await?;
        info!(
            policy_id = policy.id,
            name = %policy.name,
            effective_from = %policy.effective_from,
            "commission policy version created"
        );
        Ok(policy)
    }

    /// The policy effective at `at`: latest `effective_from <= at`.
    pub async fn resolve_effective(&self, at: TimeMs) -> Result<CommissionPolicy, SettlementError> {
        self.repo
            .find_effective_policy(at)
            .await?
            .ok_or(SettlementError::NoActivePolicy(at))
    }

    /// All versions, newest effective first.
    pub async fn list(&self) -> Result<Vec<CommissionPolicy>, SettlementError> {
        Ok(self.repo.query_policies().await?)
    }
}

fn validate(input: &NewPolicy) -> Result<(), SettlementError> {
    let total = input.split_total_bp();
    if total != FULL_SPLIT_BP {
        return Err(SettlementError::InvalidSplit(total));
    }

    match input.calc_method {
        CalcMethod::Percentage => {
            let rate = input.commission_rate_bp.ok_or_else(|| {
                SettlementError::InvalidPolicy(
                    "commissionRateBp is required for PERCENTAGE policies".to_string(),
                )
            })?;
            if rate > FULL_SPLIT_BP {
                return Err(SettlementError::InvalidPolicy(format!(
                    "commissionRateBp must be at most 10000, got {rate}"
                )));
            }
            if input.fixed_commission_minor.is_some() {
                return Err(SettlementError::InvalidPolicy(
                    "fixedCommissionMinor is not allowed for PERCENTAGE policies".to_string(),
                ));
            }
        }
        CalcMethod::Fixed => {
            let fixed = input.fixed_commission_minor.ok_or_else(|| {
                SettlementError::InvalidPolicy(
                    "fixedCommissionMinor is required for FIXED policies".to_string(),
                )
            })?;
            if !fixed.is_positive() {
                return Err(SettlementError::InvalidPolicy(
                    "fixedCommissionMinor must be positive".to_string(),
                ));
            }
            if input.commission_rate_bp.is_some() {
                return Err(SettlementError::InvalidPolicy(
                    "commissionRateBp is not allowed for FIXED policies".to_string(),
                ));
            }
        }
    }

    Ok(())
}
