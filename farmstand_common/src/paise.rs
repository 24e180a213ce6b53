use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Paise        ---------------------------------------------------------
/// An amount of money in paise (1/100 of a rupee). All prices and totals in the marketplace are integer paise, so
/// that totals can be summed without rounding drift.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Paise(i64);

op!(binary Paise, Add, add);
op!(binary Paise, Sub, sub);
op!(inplace Paise, AddAssign, add_assign);
op!(inplace Paise, SubAssign, sub_assign);
op!(unary Paise, Neg, neg);

impl Mul<i64> for Paise {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Paise {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in paise: {0}")]
pub struct PaiseConversionError(String);

impl From<i64> for Paise {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Paise {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Paise {}

impl Display for Paise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}₹{}.{:02}", abs / 100, abs % 100)
    }
}

impl Paise {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    /// Converts a decimal rupee amount, as sent by browser clients, rounding to the nearest paisa.
    pub fn from_rupee_amount(rupees: f64) -> Result<Self, PaiseConversionError> {
        let paise = (rupees * 100.0).round();
        if !paise.is_finite() || paise.abs() >= i64::MAX as f64 {
            return Err(PaiseConversionError(format!("{rupees} is not a valid rupee amount")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(paise as i64))
    }

    /// The amount in rupees, for clients that speak decimal rupees.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_rupee_amount(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    pub fn checked_mul(self, quantity: i64) -> Option<Self> {
        self.0.checked_mul(quantity).map(Self)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}
