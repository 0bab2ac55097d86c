use super::ids::CustomerId;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// A non-negative quantity of money held in a balance.
///
/// This is a wrapper around `rust_decimal::Decimal` so that available and
/// reserved funds cannot be confused with signed arithmetic results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Funds(Decimal);

/// Represents a positive monetary amount for payments.
///
/// Ensures that reservation amounts are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(format!(
                "Amount must be positive, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Funds {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Funds {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(format!(
                "Funds cannot be negative, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Subtracts `rhs`, returning `None` instead of going negative.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        if self.0 >= rhs.0 {
            Some(Self(self.0 - rhs.0))
        } else {
            None
        }
    }
}

impl TryFrom<Decimal> for Funds {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Funds> for Decimal {
    fn from(funds: Funds) -> Self {
        funds.0
    }
}

impl fmt::Display for Funds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add for Funds {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Funds {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

/// A customer's funds, split into what is free to reserve and what is
/// earmarked by pending payments.
///
/// `available + reserved` is conserved by `reserve` and `release` and only
/// shrinks on `consume`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Balance {
    pub customer_id: CustomerId,
    /// Funds free to reserve.
    pub available: Funds,
    /// Funds earmarked by in-flight payments.
    pub reserved: Funds,
}

impl Balance {
    pub fn new(customer_id: CustomerId, available: Funds) -> Self {
        Self {
            customer_id,
            available,
            reserved: Funds::ZERO,
        }
    }

    pub fn total(&self) -> Funds {
        self.available + self.reserved
    }

    /// Moves `amount` from available to reserved.
    pub fn reserve(&mut self, amount: Amount) -> Result<()> {
        let amount = Funds::from(amount);
        match self.available.checked_sub(amount) {
            Some(remaining) => {
                self.available = remaining;
                self.reserved += amount;
                Ok(())
            }
            None => Err(PaymentError::InsufficientFunds {
                requested: amount.value(),
                available: self.available.value(),
            }),
        }
    }

    /// Removes `amount` from reserved; the funds leave the balance.
    pub fn consume(&mut self, amount: Amount) -> Result<()> {
        self.reserved = self.take_reserved(amount)?;
        Ok(())
    }

    /// Moves `amount` from reserved back to available.
    pub fn release(&mut self, amount: Amount) -> Result<()> {
        self.reserved = self.take_reserved(amount)?;
        self.available += Funds::from(amount);
        Ok(())
    }

    fn take_reserved(&self, amount: Amount) -> Result<Funds> {
        self.reserved.checked_sub(amount.into()).ok_or_else(|| {
            PaymentError::Inconsistent(format!(
                "customer {} has {} reserved, cannot release {}",
                self.customer_id, self.reserved, amount
            ))
        })
    }
}
