pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod settlement;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    CommissionAllocation, CommissionPolicy, CommissionSnapshot, Currency, DealId, Dispute,
    DisputeStatus, LedgerEntry, MinorAmount, PeriodLock, Role, SnapshotStatus, TimeMs, UserId,
};
pub use error::AppError;
pub use settlement::SettlementError;
