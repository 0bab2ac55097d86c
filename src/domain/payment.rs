use super::balance::Amount;
use super::ids::{CustomerId, OrderId, PaymentId};
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a payment.
///
/// `Pending` is entered only by a reservation. `Completed` and `Canceled`
/// are terminal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "canceled" => Ok(PaymentStatus::Canceled),
            other => Err(PaymentError::ValidationError(format!(
                "Unknown payment status '{other}'"
            ))),
        }
    }
}

/// A reservation of funds against one customer's balance.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    /// Fixed at creation.
    pub amount: Amount,
    pub status: PaymentStatus,
}

impl Payment {
    pub fn pending(id: PaymentId, customer_id: CustomerId, order_id: OrderId, amount: Amount) -> Self {
        Self {
            id,
            order_id,
            customer_id,
            amount,
            status: PaymentStatus::Pending,
        }
    }

    /// Transitions `Pending -> Completed`.
    pub fn complete(&mut self) -> Result<()> {
        match self.status {
            PaymentStatus::Pending => {
                self.status = PaymentStatus::Completed;
                Ok(())
            }
            PaymentStatus::Completed => Err(PaymentError::AlreadyCompleted(self.id)),
            PaymentStatus::Canceled => Err(PaymentError::CanceledPayment(self.id)),
        }
    }

    /// Transitions `Pending -> Canceled`.
    pub fn cancel(&mut self) -> Result<()> {
        match self.status {
            PaymentStatus::Pending => {
                self.status = PaymentStatus::Canceled;
                Ok(())
            }
            PaymentStatus::Canceled => Err(PaymentError::AlreadyCanceled(self.id)),
            PaymentStatus::Completed => Err(PaymentError::CompletedPayment(self.id)),
        }
    }
}
