//! Pure computation engine(s) for deterministic ledger arithmetic.

pub mod rounding;

pub use rounding::{distribute_proportional, split_pool, RoleSplit};
