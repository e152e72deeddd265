//! Integer money in minor currency units.
//!
//! Every amount in the ledger is an i64 count of minor units (e.g. kuruş).
//! Floating point is never used for money, and amounts cross the HTTP
//! boundary as decimal strings to avoid precision loss in transport.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// An amount in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MinorAmount(pub i64);

impl MinorAmount {
    pub fn new(minor: i64) -> Self {
        MinorAmount(minor)
    }

    pub fn zero() -> Self {
        MinorAmount(0)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl Add for MinorAmount {
    type Output = MinorAmount;
    fn add(self, rhs: MinorAmount) -> MinorAmount {
        MinorAmount(self.0 + rhs.0)
    }
}

impl AddAssign for MinorAmount {
    fn add_assign(&mut self, rhs: MinorAmount) {
        self.0 += rhs.0;
    }
}

impl Sub for MinorAmount {
    type Output = MinorAmount;
    fn sub(self, rhs: MinorAmount) -> MinorAmount {
        MinorAmount(self.0 - rhs.0)
    }
}

impl SubAssign for MinorAmount {
    fn sub_assign(&mut self, rhs: MinorAmount) {
        self.0 -= rhs.0;
    }
}

impl Neg for MinorAmount {
    type Output = MinorAmount;
    fn neg(self) -> MinorAmount {
        MinorAmount(-self.0)
    }
}

impl Sum for MinorAmount {
    fn sum<I: Iterator<Item = MinorAmount>>(iter: I) -> MinorAmount {
        iter.fold(MinorAmount::zero(), |acc, a| acc + a)
    }
}

impl std::fmt::Display for MinorAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error parsing a minor-unit amount from its string encoding.
#[derive(Debug, thiserror::Error)]
#[error("invalid minor-unit amount: {0}")]
pub struct ParseMinorAmountError(String);

impl FromStr for MinorAmount {
    type Err = ParseMinorAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(MinorAmount)
            .map_err(|_| ParseMinorAmountError(s.to_string()))
    }
}

// Transport encoding: a decimal string of minor units ("1000001"), never a
// JSON number, so clients with 53-bit numerics cannot silently lose units.
impl Serialize for MinorAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for MinorAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MinorVisitor;

        impl<'de> Visitor<'de> for MinorVisitor {
            type Value = MinorAmount;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a string of minor currency units")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MinorAmount, E> {
                v.parse().map_err(de::Error::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MinorAmount, E> {
                Ok(MinorAmount(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MinorAmount, E> {
                i64::try_from(v)
                    .map(MinorAmount)
                    .map_err(|_| de::Error::custom("minor-unit amount out of range"))
            }
        }

        deserializer.deserialize_any(MinorVisitor)
    }
}
