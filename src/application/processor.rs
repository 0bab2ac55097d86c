use crate::domain::balance::Balance;
use crate::domain::event::Event;
use crate::domain::ids::{CustomerId, PaymentId};
use crate::domain::payment::Payment;
use crate::domain::ports::{Store, StoreBox, UnitOfWork};
use crate::error::{PaymentError, Result};
use tracing::{debug, info, warn};

/// Applies saga lifecycle events to a customer's balance and payments.
///
/// The processor holds no mutable state of its own; it can be shared behind
/// an `Arc` and called from any number of tasks.
pub struct TransactionProcessor {
    store: StoreBox,
}

impl TransactionProcessor {
    /// Creates a new `TransactionProcessor` over the given store.
    pub fn new(store: StoreBox) -> Self {
        Self { store }
    }

    /// Read access to the underlying store for queries.
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Applies `event` to `customer_id`'s balance in a single unit of work.
    ///
    /// Returns the payment as it stands after the transition. On any error
    /// the unit of work is rolled back and nothing is persisted. Dropping the
    /// returned future before it resolves has the same effect.
    #[tracing::instrument(skip_all, fields(customer = %customer_id, event = event.kind()))]
    pub async fn apply_event(&self, customer_id: CustomerId, event: Event) -> Result<Payment> {
        let mut uow = self.store.begin().await?;

        match Self::apply(uow.as_mut(), customer_id, event).await {
            Ok(payment) => {
                uow.commit().await?;
                info!(payment = %payment.id, status = %payment.status, "event applied");
                Ok(payment)
            }
            Err(e) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                warn!(error = %e, "event rejected");
                Err(e)
            }
        }
    }

    async fn apply(
        uow: &mut (dyn UnitOfWork + '_),
        customer_id: CustomerId,
        event: Event,
    ) -> Result<Payment> {
        let mut balance = uow.lock_balance(customer_id).await?;
        debug!(
            available = %balance.available,
            reserved = %balance.reserved,
            "balance locked"
        );

        match event {
            Event::Reserve { order_id, amount } => {
                balance.reserve(amount)?;
                uow.update_balance(&balance).await?;
                let id = uow.create_payment(customer_id, order_id, amount).await?;
                Ok(Payment::pending(id, customer_id, order_id, amount))
            }
            Event::Complete { payment_id } => {
                let mut payment = Self::owned_payment(uow, &balance, payment_id).await?;
                payment.complete()?;
                balance.consume(payment.amount)?;
                Self::persist(uow, &balance, &payment).await?;
                Ok(payment)
            }
            Event::Cancel { payment_id } => {
                let mut payment = Self::owned_payment(uow, &balance, payment_id).await?;
                payment.cancel()?;
                balance.release(payment.amount)?;
                Self::persist(uow, &balance, &payment).await?;
                Ok(payment)
            }
        }
    }

    /// Loads a payment, treating one that belongs to another customer as
    /// missing: its balance row is not the one this unit of work locked.
    async fn owned_payment(
        uow: &mut (dyn UnitOfWork + '_),
        balance: &Balance,
        payment_id: PaymentId,
    ) -> Result<Payment> {
        let payment = uow.get_payment(payment_id).await?;
        if payment.customer_id != balance.customer_id {
            return Err(PaymentError::PaymentNotFound(payment_id));
        }
        Ok(payment)
    }

    async fn persist(
        uow: &mut (dyn UnitOfWork + '_),
        balance: &Balance,
        payment: &Payment,
    ) -> Result<()> {
        uow.update_balance(balance).await?;
        uow.set_status(payment.id, payment.status).await
    }
}
