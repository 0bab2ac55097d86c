use super::StoreConfig;
use crate::domain::balance::{Amount, Balance, Funds};
use crate::domain::ids::{CustomerId, OrderId, PaymentId};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{BalanceStore, PaymentStore, Store, UnitOfWork, UnitOfWorkBox};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, ErrorKind, IteratorMode, Options,
    Transaction, TransactionDB, TransactionDBOptions, TransactionOptions, WriteOptions,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Column Family for storing balances, keyed by customer id.
pub const CF_BALANCES: &str = "balances";
/// Column Family for storing payments, keyed by payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family indexing payments by order: key is order id followed by
/// payment id, value is empty. Payment ids are time-ordered, so a prefix scan
/// yields an order's payments oldest first.
pub const CF_PAYMENTS_BY_ORDER: &str = "payments_by_order";

impl From<rocksdb::Error> for PaymentError {
    fn from(e: rocksdb::Error) -> Self {
        match e.kind() {
            ErrorKind::TimedOut => PaymentError::LockTimeout(e.to_string()),
            _ => PaymentError::RocksDB(e),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| PaymentError::InternalError(Box::new(e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| PaymentError::InternalError(Box::new(e)))
}

fn cf<'d>(db: &'d TransactionDB, name: &str) -> Result<&'d ColumnFamily> {
    db.cf_handle(name).ok_or_else(|| {
        PaymentError::InternalError(Box::new(std::io::Error::other(format!(
            "Column family '{name}' not found"
        ))))
    })
}

fn order_index_key(order_id: OrderId, payment_id: PaymentId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(order_id.as_bytes());
    key.extend_from_slice(payment_id.as_bytes());
    key
}

/// A persistent store implementation using a RocksDB `TransactionDB`.
///
/// Every unit of work is a pessimistic RocksDB transaction. Locking a
/// balance is `get_for_update` on its key, which holds an exclusive key
/// lock until the transaction commits or rolls back. Balances, payments and
/// the order index live in separate Column Families.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<TransactionDB>,
    config: StoreConfig,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let mut txn_db_opts = TransactionDBOptions::default();
        txn_db_opts.set_txn_lock_timeout(lock_timeout_ms(&config));

        let cfs = [CF_BALANCES, CF_PAYMENTS, CF_PAYMENTS_BY_ORDER]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = TransactionDB::open_cf_descriptors(&opts, &txn_db_opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            config,
        })
    }

    fn transaction(&self) -> Transaction<'_, TransactionDB> {
        let mut txn_opts = TransactionOptions::default();
        txn_opts.set_lock_timeout(lock_timeout_ms(&self.config));
        self.db.transaction_opt(&WriteOptions::default(), &txn_opts)
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = cf(&self.db, cf_name)?;
        self.db
            .get_cf(cf, key)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }
}

fn lock_timeout_ms(config: &StoreConfig) -> i64 {
    i64::try_from(config.lock_timeout.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl Store for RocksDBStore {
    async fn begin<'a>(&'a self) -> Result<UnitOfWorkBox<'a>> {
        Ok(Box::new(RocksDBUnitOfWork {
            db: self.db.as_ref(),
            txn: self.transaction(),
        }))
    }

    async fn open_balance(&self, customer_id: CustomerId, available: Funds) -> Result<Balance> {
        let cf = cf(&self.db, CF_BALANCES)?;
        let txn = self.transaction();
        if txn.get_for_update_cf(cf, customer_id.as_bytes(), true)?.is_some() {
            return Err(PaymentError::DuplicateKey(format!(
                "balance for customer {customer_id}"
            )));
        }
        let balance = Balance::new(customer_id, available);
        txn.put_cf(cf, customer_id.as_bytes(), encode(&balance)?)?;
        txn.commit()?;
        Ok(balance)
    }

    async fn balance(&self, customer_id: CustomerId) -> Result<Option<Balance>> {
        self.read(CF_BALANCES, customer_id.as_bytes())
    }

    async fn balances(&self) -> Result<Vec<Balance>> {
        let cf = cf(&self.db, CF_BALANCES)?;
        // Keys are raw uuid bytes, so iteration order is customer order.
        self.db
            .iterator_cf(cf, IteratorMode::Start)
            .map(|item| {
                let (_key, value) = item?;
                decode(&value)
            })
            .collect()
    }

    async fn payment(&self, payment_id: PaymentId) -> Result<Option<Payment>> {
        self.read(CF_PAYMENTS, payment_id.as_bytes())
    }

    async fn payments_by_order(&self, order_id: OrderId) -> Result<Vec<Payment>> {
        let index = cf(&self.db, CF_PAYMENTS_BY_ORDER)?;
        let prefix: &[u8] = order_id.as_bytes();

        let mut payment_ids = Vec::new();
        let iter = self
            .db
            .iterator_cf(index, IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let payment_id = uuid::Uuid::from_slice(&key[prefix.len()..])
                .map(PaymentId::new)
                .map_err(|e| PaymentError::InternalError(Box::new(e)))?;
            payment_ids.push(payment_id);
        }

        let mut payments = Vec::with_capacity(payment_ids.len());
        for payment_id in payment_ids {
            if let Some(payment) = self.read(CF_PAYMENTS, payment_id.as_bytes())? {
                payments.push(payment);
            }
        }
        Ok(payments)
    }
}

/// A unit of work backed by one pessimistic RocksDB transaction.
///
/// Dropping it without commit rolls the transaction back and releases its
/// key locks.
pub struct RocksDBUnitOfWork<'a> {
    db: &'a TransactionDB,
    txn: Transaction<'a, TransactionDB>,
}

impl RocksDBUnitOfWork<'_> {
    fn locked_payment(&self, payment_id: PaymentId) -> Result<Payment> {
        let cf = cf(self.db, CF_PAYMENTS)?;
        let bytes = self
            .txn
            .get_for_update_cf(cf, payment_id.as_bytes(), true)?
            .ok_or(PaymentError::PaymentNotFound(payment_id))?;
        decode(&bytes)
    }
}

#[async_trait]
impl BalanceStore for RocksDBUnitOfWork<'_> {
    /// Waits inside RocksDB for the key lock without yielding to the runtime,
    /// so only `StoreConfig::lock_timeout` bounds the wait. A caller's
    /// `tokio::time::timeout` is observed once this returns.
    async fn lock_balance(&mut self, customer_id: CustomerId) -> Result<Balance> {
        let cf = cf(self.db, CF_BALANCES)?;
        let bytes = self
            .txn
            .get_for_update_cf(cf, customer_id.as_bytes(), true)?
            .ok_or(PaymentError::BalanceNotFound(customer_id))?;
        debug!(customer = %customer_id, "row lock acquired");
        decode(&bytes)
    }

    async fn update_balance(&mut self, balance: &Balance) -> Result<()> {
        let cf = cf(self.db, CF_BALANCES)?;
        self.txn
            .put_cf(cf, balance.customer_id.as_bytes(), encode(balance)?)?;
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for RocksDBUnitOfWork<'_> {
    async fn create_payment(
        &mut self,
        customer_id: CustomerId,
        order_id: OrderId,
        amount: Amount,
    ) -> Result<PaymentId> {
        let payments = cf(self.db, CF_PAYMENTS)?;
        let index = cf(self.db, CF_PAYMENTS_BY_ORDER)?;

        let id = PaymentId::generate();
        if self
            .txn
            .get_for_update_cf(payments, id.as_bytes(), true)?
            .is_some()
        {
            return Err(PaymentError::DuplicateKey(format!("payment {id}")));
        }

        let payment = Payment::pending(id, customer_id, order_id, amount);
        self.txn.put_cf(payments, id.as_bytes(), encode(&payment)?)?;
        self.txn.put_cf(index, order_index_key(order_id, id), b"")?;
        Ok(id)
    }

    async fn get_payment(&mut self, payment_id: PaymentId) -> Result<Payment> {
        let cf = cf(self.db, CF_PAYMENTS)?;
        let bytes = self
            .txn
            .get_cf(cf, payment_id.as_bytes())?
            .ok_or(PaymentError::PaymentNotFound(payment_id))?;
        decode(&bytes)
    }

    async fn set_status(&mut self, payment_id: PaymentId, status: PaymentStatus) -> Result<()> {
        let mut payment = self.locked_payment(payment_id)?;
        payment.status = status;
        let cf = cf(self.db, CF_PAYMENTS)?;
        self.txn.put_cf(cf, payment_id.as_bytes(), encode(&payment)?)?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for RocksDBUnitOfWork<'_> {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.txn.commit()?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.txn.rollback()?;
        Ok(())
    }
}
