//! Append-only ledger of monetary events.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{DealId, MinorAmount, TimeMs, UserId};

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    /// Approved commission posted for a snapshot.
    Allocation,
    /// Cash movement toward a beneficiary.
    Payout,
    /// Offset against a previously approved allocation.
    Reversal,
    /// Manual deal-level correction.
    Adjustment,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Allocation => "ALLOCATION",
            EntryType::Payout => "PAYOUT",
            EntryType::Reversal => "REVERSAL",
            EntryType::Adjustment => "ADJUSTMENT",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown ledger entry type: {0}")]
pub struct ParseEntryTypeError(String);

impl FromStr for EntryType {
    type Err = ParseEntryTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALLOCATION" => Ok(EntryType::Allocation),
            "PAYOUT" => Ok(EntryType::Payout),
            "REVERSAL" => Ok(EntryType::Reversal),
            "ADJUSTMENT" => Ok(EntryType::Adjustment),
            other => Err(ParseEntryTypeError(other.to_string())),
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sign of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Credit => "CREDIT",
            Direction::Debit => "DEBIT",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown ledger direction: {0}")]
pub struct ParseDirectionError(String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT" => Ok(Direction::Credit),
            "DEBIT" => Ok(Direction::Debit),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single immutable ledger row. Entries are only ever appended; no update
/// or delete path exists anywhere in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: i64,
    pub deal_id: DealId,
    /// None for deal-level adjustments.
    pub snapshot_id: Option<i64>,
    pub entry_type: EntryType,
    pub direction: Direction,
    /// Strictly positive; the direction carries the sign.
    pub amount_minor: MinorAmount,
    pub occurred_at: TimeMs,
    pub memo: String,
    pub actor_id: UserId,
}

/// An entry about to be appended (no id yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub deal_id: DealId,
    pub snapshot_id: Option<i64>,
    pub entry_type: EntryType,
    pub direction: Direction,
    pub amount_minor: MinorAmount,
    pub occurred_at: TimeMs,
    pub memo: String,
    pub actor_id: UserId,
}
