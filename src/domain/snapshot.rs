//! Commission snapshots and their allocations.
//!
//! A snapshot is a versioned, immutable computation of a deal's commission
//! split at a point in time. Versions are 1-based and monotonically increase
//! per deal; only the status field and approval metadata ever change after
//! insert, driven by the approval and reversal workflows.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{Currency, DealId, MinorAmount, TimeMs, UserId};

/// Beneficiary roles of a commission split. Closed set: the rounding engine
/// is exhaustive over these four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Hunter,
    Consultant,
    Broker,
    System,
}

impl Role {
    /// All roles in canonical order. The SYSTEM role is last and absorbs
    /// rounding residue.
    pub const ALL: [Role; 4] = [Role::Hunter, Role::Consultant, Role::Broker, Role::System];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Hunter => "HUNTER",
            Role::Consultant => "CONSULTANT",
            Role::Broker => "BROKER",
            Role::System => "SYSTEM",
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Role::System)
    }

    /// Position of this role within `Role::ALL`.
    pub fn index(&self) -> usize {
        match self {
            Role::Hunter => 0,
            Role::Consultant => 1,
            Role::Broker => 2,
            Role::System => 3,
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HUNTER" => Ok(Role::Hunter),
            "CONSULTANT" => Ok(Role::Consultant),
            "BROKER" => Ok(Role::Broker),
            "SYSTEM" => Ok(Role::System),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval/reversal lifecycle of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
    PartiallyReversed,
    Reversed,
}

impl SnapshotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotStatus::Draft => "DRAFT",
            SnapshotStatus::PendingApproval => "PENDING_APPROVAL",
            SnapshotStatus::Approved => "APPROVED",
            SnapshotStatus::Rejected => "REJECTED",
            SnapshotStatus::PartiallyReversed => "PARTIALLY_REVERSED",
            SnapshotStatus::Reversed => "REVERSED",
        }
    }

    /// A snapshot still in the approval pipeline. Recomputing a deal with
    /// identical inputs while one of these exists returns it unchanged.
    pub fn is_open(&self) -> bool {
        matches!(self, SnapshotStatus::Draft | SnapshotStatus::PendingApproval)
    }

    /// Statuses carrying approved money: payouts and reversals apply only to
    /// these.
    pub fn is_reversible(&self) -> bool {
        matches!(
            self,
            SnapshotStatus::Approved | SnapshotStatus::PartiallyReversed
        )
    }

    /// Approved at some point (money was posted to the ledger).
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SnapshotStatus::Approved
                | SnapshotStatus::PartiallyReversed
                | SnapshotStatus::Reversed
        )
    }
}

#[derive(Debug, Error)]
#[error("unknown snapshot status: {0}")]
pub struct ParseSnapshotStatusError(String);

impl FromStr for SnapshotStatus {
    type Err = ParseSnapshotStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(SnapshotStatus::Draft),
            "PENDING_APPROVAL" => Ok(SnapshotStatus::PendingApproval),
            "APPROVED" => Ok(SnapshotStatus::Approved),
            "REJECTED" => Ok(SnapshotStatus::Rejected),
            "PARTIALLY_REVERSED" => Ok(SnapshotStatus::PartiallyReversed),
            "REVERSED" => Ok(SnapshotStatus::Reversed),
            other => Err(ParseSnapshotStatusError(other.to_string())),
        }
    }
}

impl std::fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A versioned commission computation for one deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSnapshot {
    pub id: i64,
    pub deal_id: DealId,
    /// 1-based, unique and monotonically increasing per deal.
    pub version: i64,
    /// The exact policy used, frozen at compute time.
    pub policy_id: i64,
    pub pool_amount_minor: MinorAmount,
    pub currency: Currency,
    pub status: SnapshotStatus,
    pub maker_id: UserId,
    pub approver_id: Option<UserId>,
    pub note: Option<String>,
    pub created_at: TimeMs,
    pub approved_at: Option<TimeMs>,
}

/// One role's slice of a snapshot's pool.
///
/// Invariant maintained by every mutation: paid + reversed <= amount, so the
/// derived outstanding amount is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionAllocation {
    pub id: i64,
    pub snapshot_id: i64,
    pub role: Role,
    /// The beneficiary; None for the SYSTEM share.
    pub user_id: Option<UserId>,
    pub basis_points: u32,
    pub amount_minor: MinorAmount,
    pub paid_minor: MinorAmount,
    pub reversed_minor: MinorAmount,
}

impl CommissionAllocation {
    /// amount - paid - reversed, always >= 0.
    pub fn outstanding_minor(&self) -> MinorAmount {
        self.amount_minor - self.paid_minor - self.reversed_minor
    }
}

/// Beneficiary identities for the human roles of a split, supplied by the
/// deal-owning caller at compute time. The SYSTEM share never has one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBeneficiaries {
    pub hunter: Option<UserId>,
    pub consultant: Option<UserId>,
    pub broker: Option<UserId>,
}

impl RoleBeneficiaries {
    pub fn for_role(&self, role: Role) -> Option<UserId> {
        match role {
            Role::Hunter => self.hunter.clone(),
            Role::Consultant => self.consultant.clone(),
            Role::Broker => self.broker.clone(),
            Role::System => None,
        }
    }
}
