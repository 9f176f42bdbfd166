//! Value amounts in wei.
//!
//! Amounts are fixed-point integers (u128) to avoid floating-point errors.
//! The smallest unit is 1 wei; 1 ETH is 10^18 wei.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::HopeError;

/// Wei per ether.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

const WEI_PER_MILLIETHER: u128 = WEI_PER_ETHER / 1_000;

/// A value transferred to, held by, or released from the vault.
///
/// Serialized as a decimal wei string, since TOML and many JSON consumers
/// cannot carry 128-bit integers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub const fn new(wei: u128) -> Self {
        Self(wei)
    }

    /// Whole ether.
    pub const fn ether(eth: u128) -> Self {
        Self(eth * WEI_PER_ETHER)
    }

    /// Thousandths of an ether (`milliether(5)` is 0.005 ETH).
    pub const fn milliether(milli: u128) -> Self {
        Self(milli * WEI_PER_MILLIETHER)
    }

    pub fn wei(&self) -> u128 {
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

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `floor(self × bps / 10 000)`, `None` on overflow.
    pub fn checked_mul_bps(self, bps: u64) -> Option<Self> {
        self.0
            .checked_mul(bps as u128)
            .map(|v| Self(v / 10_000))
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

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| acc + a)
    }
}

/// Renders as decimal ether with trailing zeros trimmed, e.g. `0.005 ETH`.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            return write!(f, "{} ETH", whole);
        }
        let digits = format!("{:018}", frac);
        write!(f, "{}.{} ETH", whole, digits.trim_end_matches('0'))
    }
}

/// Accepts raw wei (`"10000000000000000"`) or decimal ether (`"0.01 ETH"`).
impl FromStr for Amount {
    type Err = HopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || HopeError::Other(format!("invalid amount: {s:?}"));
        let Some(eth) = s.strip_suffix("ETH") else {
            return s.parse::<u128>().map(Self).map_err(|_| invalid());
        };
        let eth = eth.trim();
        let (whole, frac) = eth.split_once('.').unwrap_or((eth, ""));
        if frac.len() > 18 || (whole.is_empty() && frac.is_empty()) {
            return Err(invalid());
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac: u128 = if frac.is_empty() {
            0
        } else {
            format!("{:0<18}", frac).parse().map_err(|_| invalid())?
        };
        whole
            .checked_mul(WEI_PER_ETHER)
            .and_then(|w| w.checked_add(frac))
            .map(Self)
            .ok_or(HopeError::Overflow)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_trims_fraction() {
        assert_eq!(Amount::ether(2).to_string(), "2 ETH");
        assert_eq!(Amount::milliether(5).to_string(), "0.005 ETH");
        assert_eq!(Amount::milliether(1500).to_string(), "1.5 ETH");
        assert_eq!(Amount::new(1).to_string(), "0.000000000000000001 ETH");
    }

    #[test]
    fn mul_bps_floors() {
        assert_eq!(
            Amount::milliether(10).checked_mul_bps(15_000),
            Some(Amount::milliether(15))
        );
        assert_eq!(Amount::new(3).checked_mul_bps(5_000), Some(Amount::new(1)));
        assert_eq!(Amount::new(u128::MAX).checked_mul_bps(2), None);
    }

    #[test]
    fn parse_wei_and_ether() {
        assert_eq!("1500".parse::<Amount>().unwrap(), Amount::new(1500));
        assert_eq!("0.01 ETH".parse::<Amount>().unwrap(), Amount::milliether(10));
        assert_eq!("2ETH".parse::<Amount>().unwrap(), Amount::ether(2));
        assert_eq!(".5 ETH".parse::<Amount>().unwrap(), Amount::milliether(500));
        assert!("1.0000000000000000001 ETH".parse::<Amount>().is_err());
        assert!("ETH".parse::<Amount>().is_err());
        assert!("-1".parse::<Amount>().is_err());
    }

    #[test]
    fn display_parses_back() {
        let a = Amount::milliether(1234);
        assert_eq!(a.to_string().parse::<Amount>().unwrap(), a);
    }

    #[test]
    fn checked_arithmetic() {
        assert_eq!(Amount::new(u128::MAX).checked_add(Amount::new(1)), None);
        assert_eq!(Amount::ZERO.checked_sub(Amount::new(1)), None);
        assert_eq!(Amount::ZERO.saturating_sub(Amount::new(1)), Amount::ZERO);
    }
}
