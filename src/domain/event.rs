use super::balance::Amount;
use super::ids::{OrderId, PaymentId};
use crate::error::Result;
use rust_decimal::Decimal;

/// A lifecycle command issued by the saga orchestrator against one
/// customer's balance.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Event {
    /// Earmark `amount` for `order_id`, creating a pending payment.
    Reserve { order_id: OrderId, amount: Amount },
    /// Consume the reservation held by a pending payment.
    Complete { payment_id: PaymentId },
    /// Compensate a reservation, returning its funds to available.
    Cancel { payment_id: PaymentId },
}

impl Event {
    pub fn reserve(order_id: OrderId, amount: Decimal) -> Result<Self> {
        Ok(Event::Reserve {
            order_id,
            amount: Amount::new(amount)?,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Reserve { .. } => "reserve",
            Event::Complete { .. } => "complete",
            Event::Cancel { .. } => "cancel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PaymentError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reserve_requires_positive_amount() {
        let order = OrderId::generate();
        assert!(Event::reserve(order, dec!(10)).is_ok());
        assert!(matches!(
            Event::reserve(order, dec!(0)),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_event_kind() {
        let payment_id = PaymentId::generate();
        assert_eq!(Event::Complete { payment_id }.kind(), "complete");
        assert_eq!(Event::Cancel { payment_id }.kind(), "cancel");
        assert_eq!(
            Event::reserve(OrderId::generate(), dec!(1)).unwrap().kind(),
            "reserve"
        );
    }
}
