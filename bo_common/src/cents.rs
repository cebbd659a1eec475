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

pub const DEFAULT_CURRENCY_CODE: &str = "usd";
/// Fee rates are expressed in basis points. 10,000 bps == 100%.
pub const BASIS_POINTS_SCALE: i64 = 10_000;

//--------------------------------------       Cents         ---------------------------------------------------------
/// An amount of money in the smallest currency unit. All prices, holds, captures and fees are tracked in cents so that
/// no floating point arithmetic is ever involved in moving money around.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(inplace Cents, SubAssign, sub_assign);
op!(unary Cents, Neg, neg);

impl Mul<i64> for Cents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Cents {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Cents {}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CentsConversionError(format!("Value {value} is too large to convert to Cents")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

/// Parses decimal currency strings, as used by storefront APIs, e.g. `"199.99"`, `"12.5"` or `"7"`.
impl FromStr for Cents {
    type Err = CentsConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let invalid = || CentsConversionError(format!("'{s}' is not a valid price"));
        if value.is_empty() || value.starts_with('-') || value.starts_with('+') {
            return Err(invalid());
        }
        let (whole, fraction) = match value.split_once('.') {
            Some((w, f)) => (w, f),
            None => (value, ""),
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        // Storefronts occasionally send "19.990"; anything finer than a cent must be zero padding.
        let (cents_part, rest) = fraction.split_at(fraction.len().min(2));
        if rest.chars().any(|c| c != '0') {
            return Err(CentsConversionError(format!("'{s}' has sub-cent precision")));
        }
        let whole = whole.parse::<i64>().map_err(|_| invalid())?;
        let cents = match cents_part.len() {
            0 => 0,
            1 => cents_part.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => cents_part.parse::<i64>().map_err(|_| invalid())?,
        };
        whole.checked_mul(100).and_then(|w| w.checked_add(cents)).map(Self).ok_or_else(invalid)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// The fee owed on this amount at the given rate in basis points, rounded half up to the nearest cent.
    ///
    /// ```
    /// # use bo_common::Cents;
    /// assert_eq!(Cents::from(8000).fee_at(250), Cents::from(200));
    /// assert_eq!(Cents::from(14999).fee_at(250), Cents::from(375));
    /// ```
    pub fn fee_at(&self, bps: u32) -> Self {
        let numerator = i128::from(self.0) * i128::from(bps);
        let scale = i128::from(BASIS_POINTS_SCALE);
        let rounded = if numerator >= 0 { (numerator + scale / 2) / scale } else { (numerator - scale / 2) / scale };
        #[allow(clippy::cast_possible_truncation)]
        Self(rounded as i64)
    }

    /// Renders the amount as a plain decimal string, without currency symbol, e.g. `"149.99"`.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_prices() {
        assert_eq!("199.99".parse::<Cents>().unwrap(), Cents::from(19999));
        assert_eq!("149.99".parse::<Cents>().unwrap(), Cents::from(14999));
        assert_eq!("12.5".parse::<Cents>().unwrap(), Cents::from(1250));
        assert_eq!("7".parse::<Cents>().unwrap(), Cents::from(700));
        assert_eq!("0.05".parse::<Cents>().unwrap(), Cents::from(5));
        assert_eq!("19.990".parse::<Cents>().unwrap(), Cents::from(1999));
        assert!("19.999".parse::<Cents>().is_err());
        assert!("-5.00".parse::<Cents>().is_err());
        assert!("abc".parse::<Cents>().is_err());
        assert!(".50".parse::<Cents>().is_err());
        assert!("".parse::<Cents>().is_err());
    }

    #[test]
    fn fees_round_half_up() {
        assert_eq!(Cents::from(8000).fee_at(250), Cents::from(200));
        // 2.5% of $0.20 is exactly half a cent
        assert_eq!(Cents::from(20).fee_at(250), Cents::from(1));
        assert_eq!(Cents::from(19).fee_at(250), Cents::from(0));
        assert_eq!(Cents::from(13999).fee_at(250), Cents::from(350));
        assert_eq!(Cents::from(10_000).fee_at(0), Cents::from(0));
    }

    #[test]
    fn display() {
        assert_eq!(Cents::from(8000).to_string(), "$80.00");
        assert_eq!(Cents::from(19999).to_string(), "$199.99");
        assert_eq!(Cents::from(-150).to_string(), "-$1.50");
        assert_eq!(Cents::from(5).to_decimal_string(), "0.05");
    }

    #[test]
    fn arithmetic() {
        let total: Cents = [Cents::from(100), Cents::from(250)].into_iter().sum();
        assert_eq!(total, Cents::from(350));
        let mut c = Cents::from_dollars(2);
        c -= Cents::from(50);
        c += Cents::from(5);
        assert_eq!(c, Cents::from(155));
        assert_eq!(Cents::from(3) * 4, Cents::from(12));
        assert_eq!(-Cents::from(3), Cents::from(-3));
    }

    #[test]
    fn serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Cents::from(8000)).unwrap(), "8000");
        let c: Cents = serde_json::from_str("14999").unwrap();
        assert_eq!(c, Cents::from(14999));
    }
}
