use crate::domain::ids::{CustomerId, PaymentId};
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Balance not found for customer {0}")]
    BalanceNotFound(CustomerId),
    #[error("Payment {0} not found")]
    PaymentNotFound(PaymentId),
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },
    #[error("Payment {0} is completed and cannot be canceled")]
    CompletedPayment(PaymentId),
    #[error("Payment {0} is canceled and cannot be completed")]
    CanceledPayment(PaymentId),
    #[error("Payment {0} is already completed")]
    AlreadyCompleted(PaymentId),
    #[error("Payment {0} is already canceled")]
    AlreadyCanceled(PaymentId),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Timed out waiting for row lock: {0}")]
    LockTimeout(String),
    #[error("Inconsistent state: {0}")]
    Inconsistent(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDB(rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl PaymentError {
    /// True for a terminal event delivered a second time against a payment
    /// that is already in the state that event leads to.
    ///
    /// The balance has not been touched again, so an orchestrator replaying
    /// after a lost acknowledgement may treat this as success.
    pub fn is_idempotent_replay(&self) -> bool {
        matches!(
            self,
            PaymentError::AlreadyCompleted(_) | PaymentError::AlreadyCanceled(_)
        )
    }
}
