//! Fixed-point USD amounts for cost accounting.
//!
//! Costs are carried as integer micro-dollars (six decimal places, the same
//! granularity the pricing formula rounds to) and serialized as decimal
//! strings, so cache and query-log round-trips are exact. Re-encoding a cost
//! through floating point is never allowed once it has been computed.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const MICROS_PER_USD: i64 = 1_000_000;
const MAX_FRACTION_DIGITS: usize = 6;

/// A non-negative USD amount with six decimal places of precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct CostUsd(i64);

impl CostUsd {
    pub const ZERO: CostUsd = CostUsd(0);

    pub fn from_micros(micros: i64) -> Self {
        CostUsd(micros.max(0))
    }

    pub fn micros(&self) -> i64 {
        self.0
    }

    /// Price a completion from per-1K-token rates, rounded to six decimals.
    pub fn from_token_usage(
        tokens_in: u32,
        tokens_out: u32,
        price_in_per_1k: f64,
        price_out_per_1k: f64,
    ) -> Self {
        let usd = f64::from(tokens_in) * price_in_per_1k / 1000.0
            + f64::from(tokens_out) * price_out_per_1k / 1000.0;
        CostUsd(((usd * MICROS_PER_USD as f64).round() as i64).max(0))
    }
}

impl fmt::Display for CostUsd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:06}",
            self.0 / MICROS_PER_USD,
            self.0 % MICROS_PER_USD
        )
    }
}

impl FromStr for CostUsd {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(format!("cost must be non-negative: {s}"));
        }

        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };
        if fraction.len() > MAX_FRACTION_DIGITS {
            return Err(format!("cost has more than six decimal places: {s}"));
        }

        let whole: i64 = whole
            .parse()
            .map_err(|_| format!("invalid cost amount: {s}"))?;
        let fraction_micros: i64 = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{fraction:0<6}");
            padded
                .parse()
                .map_err(|_| format!("invalid cost amount: {s}"))?
        };

        Ok(CostUsd(whole * MICROS_PER_USD + fraction_micros))
    }
}

impl Serialize for CostUsd {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CostUsd {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
