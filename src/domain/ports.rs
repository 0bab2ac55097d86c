use super::balance::{Amount, Balance, Funds};
use super::ids::{CustomerId, OrderId, PaymentId};
use super::payment::{Payment, PaymentStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Balance operations available inside a unit of work.
#[async_trait]
pub trait BalanceStore: Send {
    /// Reads the customer's balance and holds an exclusive lock on it until
    /// the unit of work commits or rolls back.
    ///
    /// Fails with `BalanceNotFound` when the customer has no balance.
    async fn lock_balance(&mut self, customer_id: CustomerId) -> Result<Balance>;

    /// Overwrites a balance previously locked in this unit of work.
    async fn update_balance(&mut self, balance: &Balance) -> Result<()>;
}

/// Payment operations available inside a unit of work.
#[async_trait]
pub trait PaymentStore: Send {
    /// Inserts a new `Pending` payment and returns its generated identifier.
    ///
    /// An identifier collision surfaces as `DuplicateKey`.
    async fn create_payment(
        &mut self,
        customer_id: CustomerId,
        order_id: OrderId,
        amount: Amount,
    ) -> Result<PaymentId>;

    /// Fails with `PaymentNotFound` when no such payment exists.
    async fn get_payment(&mut self, payment_id: PaymentId) -> Result<Payment>;

    async fn set_status(&mut self, payment_id: PaymentId, status: PaymentStatus) -> Result<()>;
}

/// One atomic, all-or-nothing grouping of balance and payment writes.
///
/// Nothing written through a unit of work is visible to other callers
/// before `commit`. Dropping it without committing rolls it back.
#[async_trait]
pub trait UnitOfWork: BalanceStore + PaymentStore {
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

pub type UnitOfWorkBox<'a> = Box<dyn UnitOfWork + 'a>;

/// A durable store of balances and payments.
///
/// Query methods read committed state only and take no locks.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin<'a>(&'a self) -> Result<UnitOfWorkBox<'a>>;

    /// Creates the balance row for a customer. Fails with `DuplicateKey` if
    /// one already exists.
    async fn open_balance(&self, customer_id: CustomerId, available: Funds) -> Result<Balance>;

    async fn balance(&self, customer_id: CustomerId) -> Result<Option<Balance>>;

    /// All balances, ordered by customer.
    async fn balances(&self) -> Result<Vec<Balance>>;

    async fn payment(&self, payment_id: PaymentId) -> Result<Option<Payment>>;

    /// Payments created for `order_id`, oldest first.
    async fn payments_by_order(&self, order_id: OrderId) -> Result<Vec<Payment>>;
}

pub type StoreBox = Box<dyn Store>;
