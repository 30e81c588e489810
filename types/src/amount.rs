//! Coin amounts.
//!
//! Amounts are integer atoms to avoid floating-point errors. One coin is
//! `ATOMS_PER_COIN` atoms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

pub const ATOMS_PER_COIN: i64 = 100_000_000;

/// Largest amount any single output or transaction may carry.
pub const MAX_AMOUNT: i64 = 21_000_000 * ATOMS_PER_COIN;

/// An amount in atoms.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn from_atoms(atoms: i64) -> Self {
        Self(atoms)
    }

    pub fn atoms(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Value in whole coins, for display and JSON reporting.
    pub fn to_coins(&self) -> f64 {
        self.0 as f64 / ATOMS_PER_COIN as f64
    }

    /// `percent` of this amount, truncated to whole atoms.
    pub fn percentage(&self, percent: f64) -> Self {
        Self((self.0 as f64 * percent / 100.0) as i64)
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = ATOMS_PER_COIN as u64;
        write!(f, "{sign}{}.{:08} DCR", abs / per, abs % per)
    }
}
