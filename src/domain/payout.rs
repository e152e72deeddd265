//! Payouts and their links to allocations.
//!
//! A payout records cash movement; it never executes one. A single payout can
//! settle several allocations at once via links, and an allocation can be
//! filled by several payouts over time (partial fills).

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{MinorAmount, TimeMs, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutMethod {
    BankTransfer,
    Cash,
    Other,
}

impl PayoutMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutMethod::BankTransfer => "BANK_TRANSFER",
            PayoutMethod::Cash => "CASH",
            PayoutMethod::Other => "OTHER",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown payout method: {0}")]
pub struct ParsePayoutMethodError(String);

impl FromStr for PayoutMethod {
    type Err = ParsePayoutMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BANK_TRANSFER" => Ok(PayoutMethod::BankTransfer),
            "CASH" => Ok(PayoutMethod::Cash),
            "OTHER" => Ok(PayoutMethod::Other),
            other => Err(ParsePayoutMethodError(other.to_string())),
        }
    }
}

impl std::fmt::Display for PayoutMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded payout. `payout_key` is the externally visible identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub id: i64,
    pub payout_key: String,
    pub paid_at: TimeMs,
    pub method: PayoutMethod,
    pub reference_no: Option<String>,
    pub created_by: UserId,
    pub created_at: TimeMs,
}

/// Amount of one payout applied against one allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutAllocationLink {
    pub id: i64,
    pub payout_id: i64,
    pub allocation_id: i64,
    pub amount_minor: MinorAmount,
}
