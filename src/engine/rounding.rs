//! Deterministic basis-point allocation of integer minor units.
//!
//! Two operations, both exact: splitting a commission pool across the four
//! beneficiary roles, and distributing a reversal amount proportionally over
//! current outstanding balances. In both, integer residue lands on the SYSTEM
//! role, never on a human beneficiary, so the totals always balance to the
//! unit.

use crate::domain::{MinorAmount, Role, RoundingRule, FULL_SPLIT_BP};

/// Per-role amounts in `Role::ALL` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSplit {
    amounts: [MinorAmount; 4],
}

impl RoleSplit {
    pub fn new(amounts: [MinorAmount; 4]) -> Self {
        RoleSplit { amounts }
    }

    pub fn get(&self, role: Role) -> MinorAmount {
        self.amounts[role.index()]
    }

    pub fn total(&self) -> MinorAmount {
        self.amounts.iter().copied().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, MinorAmount)> + '_ {
        Role::ALL.iter().map(move |&r| (r, self.amounts[r.index()]))
    }
}

/// Round `pool * bp / 10000` to integer minor units per the policy rule.
fn round_share(pool: i64, bp: u32, rule: RoundingRule) -> i64 {
    let numer = pool as i128 * bp as i128;
    let denom = FULL_SPLIT_BP as i128;
    let quot = numer / denom;
    let rem = numer % denom;
    let rounded = match rule {
        RoundingRule::RoundHalfUp => {
            if rem * 2 >= denom {
                quot + 1
            } else {
                quot
            }
        }
        RoundingRule::Bankers => {
            if rem * 2 > denom {
                quot + 1
            } else if rem * 2 < denom {
                quot
            } else if quot % 2 == 0 {
                quot
            } else {
                quot + 1
            }
        }
    };
    rounded as i64
}

/// Split `pool` across the four roles at `bps` (in `Role::ALL` order, summing
/// to 10000), rounding each share per `rule`.
///
/// The rounded shares can miss `pool` by a few units in either direction; the
/// residue is applied to SYSTEM so that `total() == pool` exactly. On tiny
/// pools half-up rounding can overshoot far enough to drive SYSTEM negative,
/// in which case units are clawed back from the largest human share until
/// every amount is non-negative.
pub fn split_pool(pool: MinorAmount, bps: [u32; 4], rule: RoundingRule) -> RoleSplit {
    let pool = pool.as_i64();
    let mut amounts = [0i64; 4];
    for (i, &bp) in bps.iter().enumerate() {
        amounts[i] = round_share(pool, bp, rule);
    }

    let sys = Role::System.index();
    let residue = pool - amounts.iter().sum::<i64>();
    amounts[sys] += residue;

    while amounts[sys] < 0 {
        let largest = (0..4)
            .filter(|&i| i != sys)
            .max_by_key(|&i| (amounts[i], std::cmp::Reverse(i)))
            .expect("three human roles");
        debug_assert!(amounts[largest] > 0, "pool must cover the overshoot");
        amounts[largest] -= 1;
        amounts[sys] += 1;
    }

    RoleSplit::new(amounts.map(MinorAmount::new))
}

/// Distribute `requested` across `outstanding` (in `Role::ALL` order)
/// proportionally to each balance's share of the total.
///
/// Each share is floored, so no share can exceed its outstanding balance.
/// Residue units go to SYSTEM while it has headroom, then to whichever
/// allocation has the most headroom left. Callers must ensure
/// `requested <= sum(outstanding)`.
pub fn distribute_proportional(requested: MinorAmount, outstanding: [MinorAmount; 4]) -> RoleSplit {
    let requested = requested.as_i64();
    let out: [i64; 4] = outstanding.map(|a| a.as_i64());
    let total: i64 = out.iter().sum();
    debug_assert!(requested <= total, "requested exceeds total outstanding");

    let mut shares = [0i64; 4];
    if requested > 0 && total > 0 {
        for i in 0..4 {
            shares[i] = (requested as i128 * out[i] as i128 / total as i128) as i64;
        }

        let sys = Role::System.index();
        let mut residue = requested - shares.iter().sum::<i64>();
        while residue > 0 {
            let target = if shares[sys] < out[sys] {
                sys
            } else {
                (0..4)
                    .filter(|&i| shares[i] < out[i])
                    .max_by_key(|&i| (out[i] - shares[i], std::cmp::Reverse(i)))
                    .expect("requested <= total leaves headroom somewhere")
            };
            shares[target] += 1;
            residue -= 1;
        }
    }

    RoleSplit::new(shares.map(MinorAmount::new))
}
