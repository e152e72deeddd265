//! Versioned commission policies.
//!
//! Policies are append-only: a policy row is never mutated once written, and
//! "editing" one means inserting a new row with a later `effective_from`. The
//! policy effective at time T is the row with the latest `effective_from <= T`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{Currency, MinorAmount, TimeMs};

/// Total basis points a valid split must add up to (100%).
pub const FULL_SPLIT_BP: u32 = 10_000;

/// How the commission pool is derived from a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalcMethod {
    /// Pool = sale price * commission rate (rate in basis points).
    Percentage,
    /// Pool is a fixed minor-unit amount per deal.
    Fixed,
}

impl CalcMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalcMethod::Percentage => "PERCENTAGE",
            CalcMethod::Fixed => "FIXED",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown calc method: {0}")]
pub struct ParseCalcMethodError(String);

impl FromStr for CalcMethod {
    type Err = ParseCalcMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PERCENTAGE" => Ok(CalcMethod::Percentage),
            "FIXED" => Ok(CalcMethod::Fixed),
            other => Err(ParseCalcMethodError(other.to_string())),
        }
    }
}

impl std::fmt::Display for CalcMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rounding rule applied to each role share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundingRule {
    /// Round the fractional remainder up at >= 0.5 minor units.
    RoundHalfUp,
    /// Round half to even ("bankers' rounding").
    Bankers,
}

impl RoundingRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundingRule::RoundHalfUp => "ROUND_HALF_UP",
            RoundingRule::Bankers => "BANKERS",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown rounding rule: {0}")]
pub struct ParseRoundingRuleError(String);

impl FromStr for RoundingRule {
    type Err = ParseRoundingRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROUND_HALF_UP" => Ok(RoundingRule::RoundHalfUp),
            "BANKERS" => Ok(RoundingRule::Bankers),
            other => Err(ParseRoundingRuleError(other.to_string())),
        }
    }
}

impl std::fmt::Display for RoundingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted, immutable commission policy version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionPolicy {
    pub id: i64,
    pub name: String,
    pub calc_method: CalcMethod,
    /// Commission rate in basis points; present when calc_method = PERCENTAGE.
    pub commission_rate_bp: Option<u32>,
    /// Fixed commission pool; present when calc_method = FIXED.
    pub fixed_commission_minor: Option<MinorAmount>,
    pub currency: Currency,
    pub hunter_bp: u32,
    pub consultant_bp: u32,
    pub broker_bp: u32,
    pub system_bp: u32,
    pub rounding_rule: RoundingRule,
    pub effective_from: TimeMs,
    pub created_at: TimeMs,
}

impl CommissionPolicy {
    /// Sum of the four role splits; 10000 for any persisted policy.
    pub fn split_total_bp(&self) -> u32 {
        self.hunter_bp + self.consultant_bp + self.broker_bp + self.system_bp
    }

    /// The four splits in `Role::ALL` order (hunter, consultant, broker,
    /// system).
    pub fn split_bps(&self) -> [u32; 4] {
        [
            self.hunter_bp,
            self.consultant_bp,
            self.broker_bp,
            self.system_bp,
        ]
    }
}

/// Input for creating a new policy version. Validation lives in the
/// PolicyStore, which rejects the input before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPolicy {
    pub name: String,
    pub calc_method: CalcMethod,
    pub commission_rate_bp: Option<u32>,
    pub fixed_commission_minor: Option<MinorAmount>,
    pub currency: Currency,
    pub hunter_bp: u32,
    pub consultant_bp: u32,
    pub broker_bp: u32,
    pub system_bp: u32,
    pub rounding_rule: RoundingRule,
    pub effective_from: TimeMs,
}

impl NewPolicy {
    pub fn split_total_bp(&self) -> u32 {
        self.hunter_bp + self.consultant_bp + self.broker_bp + self.system_bp
    }
}
