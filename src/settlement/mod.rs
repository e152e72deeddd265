//! Settlement components: policy store, snapshot computer, maker-checker
//! approval, payouts, reversals, disputes, and period locks.
//!
//! Each component is a thin service over the repository; the repository runs
//! every mutating operation as a single transaction and re-checks workflow
//! guards inside it.

pub mod approval;
pub mod computer;
pub mod dispute;
pub mod locks;
pub mod payout;
pub mod policy;
pub mod reversal;

pub use approval::ApprovalWorkflow;
pub use computer::{ComputedSnapshot, SnapshotComputer};
pub use dispute::DisputeManager;
pub use locks::PeriodLockGuard;
pub use payout::{PayoutLinkRequest, PayoutProcessor, RecordedPayout};
pub use policy::PolicyStore;
pub use reversal::{ReversalOutcome, ReversalProcessor};

use thiserror::Error;

use crate::domain::{DisputeStatus, MinorAmount, TimeMs, UserId};

/// Every way a settlement operation can refuse to run. Each kind names a
/// financial- or workflow-correctness condition the caller must react to;
/// none are swallowed or downgraded to logs.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("role splits must total 10000 bp, got {0}")]
    InvalidSplit(u32),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("no commission policy effective at {0}")]
    NoActivePolicy(TimeMs),

    #[error("period is frozen by lock {lock_id}: {reason}")]
    PeriodLocked { lock_id: i64, reason: String },

    #[error("maker {0} cannot approve their own snapshot")]
    SelfApproval(UserId),

    #[error("{0}")]
    InvalidState(String),

    #[error("dispute cannot move from {from} to {to}")]
    InvalidTransition {
        from: DisputeStatus,
        to: DisputeStatus,
    },

    #[error(
        "payout of {requested} exceeds outstanding {outstanding} on allocation {allocation_id}"
    )]
    Overpayment {
        allocation_id: i64,
        requested: MinorAmount,
        outstanding: MinorAmount,
    },

    #[error("reversal of {requested} exceeds outstanding {outstanding} on snapshot {snapshot_id}")]
    Overreversal {
        snapshot_id: i64,
        requested: MinorAmount,
        outstanding: MinorAmount,
    },

    #[error("an active period lock already overlaps {from}..{to}")]
    OverlappingLock { from: TimeMs, to: TimeMs },

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl SettlementError {
    /// Stable machine-readable kind, surfaced in error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            SettlementError::InvalidSplit(_) => "INVALID_SPLIT",
            SettlementError::InvalidPolicy(_) => "INVALID_POLICY",
            SettlementError::NoActivePolicy(_) => "NO_ACTIVE_POLICY",
            SettlementError::PeriodLocked { .. } => "PERIOD_LOCKED",
            SettlementError::SelfApproval(_) => "SELF_APPROVAL",
            SettlementError::InvalidState(_) => "INVALID_STATE",
            SettlementError::InvalidTransition { .. } => "INVALID_TRANSITION",
            SettlementError::Overpayment { .. } => "OVERPAYMENT",
            SettlementError::Overreversal { .. } => "OVERREVERSAL",
            SettlementError::OverlappingLock { .. } => "OVERLAPPING_LOCK",
            SettlementError::NotFound(_) => "NOT_FOUND",
            SettlementError::Db(_) => "STORAGE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(SettlementError::InvalidSplit(9999).kind(), "INVALID_SPLIT");
        assert_eq!(
            SettlementError::SelfApproval(UserId::new("u1")).kind(),
            "SELF_APPROVAL"
        );
        assert_eq!(
            SettlementError::PeriodLocked {
                lock_id: 1,
                reason: "close".into()
            }
            .kind(),
            "PERIOD_LOCKED"
        );
    }

    #[test]
    fn test_messages_carry_amounts() {
        let err = SettlementError::Overpayment {
            allocation_id: 7,
            requested: MinorAmount::new(500),
            outstanding: MinorAmount::new(300),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("300"));
        assert!(msg.contains("allocation 7"));
    }
}
