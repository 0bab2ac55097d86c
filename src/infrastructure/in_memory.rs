use super::StoreConfig;
use crate::domain::balance::{Amount, Balance, Funds};
use crate::domain::ids::{CustomerId, OrderId, PaymentId};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{BalanceStore, PaymentStore, Store, UnitOfWork, UnitOfWorkBox};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

type RowLock = Arc<Mutex<()>>;

#[derive(Default)]
struct Payments {
    by_id: HashMap<PaymentId, Payment>,
    by_order: HashMap<OrderId, Vec<PaymentId>>,
}

impl Payments {
    fn insert(&mut self, payment: Payment) {
        if !self.by_id.contains_key(&payment.id) {
            self.by_order
                .entry(payment.order_id)
                .or_default()
                .push(payment.id);
        }
        self.by_id.insert(payment.id, payment);
    }
}

#[derive(Default)]
struct Tables {
    balances: RwLock<HashMap<CustomerId, Balance>>,
    payments: RwLock<Payments>,
    row_locks: Mutex<HashMap<CustomerId, RowLock>>,
}

/// A thread-safe in-memory store for balances and payments.
///
/// Committed rows live in `Arc<RwLock<HashMap<..>>>` tables. Each balance row
/// has its own mutex acting as the exclusive row lock, so units of work for
/// different customers never wait on each other. Writes are staged inside the
/// unit of work and applied to the tables in one step on commit.
#[derive(Clone)]
pub struct InMemoryStore {
    tables: Arc<Tables>,
    lock_timeout: Duration,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            tables: Arc::new(Tables::default()),
            lock_timeout: config.lock_timeout,
        }
    }

    async fn row_lock(&self, customer_id: CustomerId) -> RowLock {
        let mut locks = self.tables.row_locks.lock().await;
        locks.entry(customer_id).or_default().clone()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin<'a>(&'a self) -> Result<UnitOfWorkBox<'a>> {
        Ok(Box::new(InMemoryUnitOfWork {
            store: self,
            guards: HashMap::new(),
            balances: HashMap::new(),
            payments: HashMap::new(),
        }))
    }

    async fn open_balance(&self, customer_id: CustomerId, available: Funds) -> Result<Balance> {
        let mut balances = self.tables.balances.write().await;
        if balances.contains_key(&customer_id) {
            return Err(PaymentError::DuplicateKey(format!(
                "balance for customer {customer_id}"
            )));
        }
        let balance = Balance::new(customer_id, available);
        balances.insert(customer_id, balance.clone());
        Ok(balance)
    }

    async fn balance(&self, customer_id: CustomerId) -> Result<Option<Balance>> {
        let balances = self.tables.balances.read().await;
        Ok(balances.get(&customer_id).cloned())
    }

    async fn balances(&self) -> Result<Vec<Balance>> {
        let balances = self.tables.balances.read().await;
        let mut all: Vec<Balance> = balances.values().cloned().collect();
        all.sort_by_key(|b| b.customer_id);
        Ok(all)
    }

    async fn payment(&self, payment_id: PaymentId) -> Result<Option<Payment>> {
        let payments = self.tables.payments.read().await;
        Ok(payments.by_id.get(&payment_id).cloned())
    }

    async fn payments_by_order(&self, order_id: OrderId) -> Result<Vec<Payment>> {
        let payments = self.tables.payments.read().await;
        Ok(payments
            .by_order
            .get(&order_id)
            .into_iter()
            .flatten()
            .filter_map(|id| payments.by_id.get(id).cloned())
            .collect())
    }
}

/// A unit of work over [`InMemoryStore`].
///
/// Row lock guards are held until the unit of work is committed, rolled back
/// or dropped.
pub struct InMemoryUnitOfWork<'a> {
    store: &'a InMemoryStore,
    guards: HashMap<CustomerId, OwnedMutexGuard<()>>,
    balances: HashMap<CustomerId, Balance>,
    payments: HashMap<PaymentId, Payment>,
}

impl InMemoryUnitOfWork<'_> {
    async fn committed_payment(&self, payment_id: PaymentId) -> Option<Payment> {
        let payments = self.store.tables.payments.read().await;
        payments.by_id.get(&payment_id).cloned()
    }
}

#[async_trait]
impl BalanceStore for InMemoryUnitOfWork<'_> {
    async fn lock_balance(&mut self, customer_id: CustomerId) -> Result<Balance> {
        if let Some(staged) = self.balances.get(&customer_id) {
            return Ok(staged.clone());
        }

        if !self.guards.contains_key(&customer_id) {
            if self.store.balance(customer_id).await?.is_none() {
                return Err(PaymentError::BalanceNotFound(customer_id));
            }
            let row = self.store.row_lock(customer_id).await;
            let guard = tokio::time::timeout(self.store.lock_timeout, row.lock_owned())
                .await
                .map_err(|_| {
                    PaymentError::LockTimeout(format!("balance of customer {customer_id}"))
                })?;
            debug!(customer = %customer_id, "row lock acquired");
            self.guards.insert(customer_id, guard);
        }

        // Re-read under the lock: the row may have changed while we waited.
        self.store
            .balance(customer_id)
            .await?
            .ok_or(PaymentError::BalanceNotFound(customer_id))
    }

    async fn update_balance(&mut self, balance: &Balance) -> Result<()> {
        if !self.guards.contains_key(&balance.customer_id) {
            return Err(PaymentError::Inconsistent(format!(
                "balance of customer {} updated without holding its lock",
                balance.customer_id
            )));
        }
        self.balances.insert(balance.customer_id, balance.clone());
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for InMemoryUnitOfWork<'_> {
    async fn create_payment(
        &mut self,
        customer_id: CustomerId,
        order_id: OrderId,
        amount: Amount,
    ) -> Result<PaymentId> {
        let id = PaymentId::generate();
        if self.payments.contains_key(&id) || self.committed_payment(id).await.is_some() {
            return Err(PaymentError::DuplicateKey(format!("payment {id}")));
        }
        self.payments
            .insert(id, Payment::pending(id, customer_id, order_id, amount));
        Ok(id)
    }

    async fn get_payment(&mut self, payment_id: PaymentId) -> Result<Payment> {
        if let Some(staged) = self.payments.get(&payment_id) {
            return Ok(staged.clone());
        }
        self.committed_payment(payment_id)
            .await
            .ok_or(PaymentError::PaymentNotFound(payment_id))
    }

    async fn set_status(&mut self, payment_id: PaymentId, status: PaymentStatus) -> Result<()> {
        let mut payment = self.get_payment(payment_id).await?;
        payment.status = status;
        self.payments.insert(payment_id, payment);
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork<'_> {
    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        {
            // Both tables are locked together so readers never see a payment
            // transition without its balance change.
            let mut balances = this.store.tables.balances.write().await;
            let mut payments = this.store.tables.payments.write().await;
            for (customer_id, balance) in this.balances {
                balances.insert(customer_id, balance);
            }
            for (_, payment) in this.payments {
                payments.insert(payment);
            }
        }
        drop(this.guards);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        drop(self);
        Ok(())
    }
}
