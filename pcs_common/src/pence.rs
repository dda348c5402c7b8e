use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const GBP_CURRENCY_CODE: &str = "GBP";
pub const GBP_CURRENCY_CODE_LOWER: &str = "gbp";

//--------------------------------------       Pence        -----------------------------------------------------------
/// A monetary amount in minor currency units (pence). All prices, totals and balances in the platform are stored and
/// summed in this type; conversion to and from decimal pounds happens only at the edges (gateway callbacks, display).
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Pence(i64);

op!(binary Pence, Add, add);
op!(binary Pence, Sub, sub);
op!(inplace Pence, AddAssign, add_assign);
op!(inplace Pence, SubAssign, sub_assign);
op!(unary Pence, Neg, neg);

impl Mul<i64> for Pence {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Pence {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in pence: {0}")]
pub struct PenceConversionError(String);

impl From<i64> for Pence {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Pence {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Pence {}

impl TryFrom<u64> for Pence {
    type Error = PenceConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(PenceConversionError(format!("Value {} is too large to convert to Pence", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl FromStr for Pence {
    type Err = PenceConversionError;

    /// Parses a decimal currency string ("24.99", "100", "0.5") into pence without going through floating point.
    /// More than two fractional digits is an error, as is any non-digit character outside the single separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sign, s) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(PenceConversionError(format!("'{s}' is not a decimal amount")));
        }
        if frac.len() > 2 {
            return Err(PenceConversionError(format!("'{s}' has sub-penny precision")));
        }
        let parse = |v: &str| {
            v.parse::<i64>().map_err(|e| PenceConversionError(format!("'{v}' is not a valid number. {e}")))
        };
        let pounds = if whole.is_empty() { 0 } else { parse(whole)? };
        let pennies = if frac.is_empty() {
            0
        } else {
            // "5" means 50p, "05" means 5p
            parse(frac)? * if frac.len() == 1 { 10 } else { 1 }
        };
        Ok(Self(sign * (pounds * 100 + pennies)))
    }
}

impl Display for Pence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}£{}.{:02}", abs / 100, abs % 100)
    }
}

impl Pence {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_pounds(pounds: i64) -> Self {
        Self(pounds * 100)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}
