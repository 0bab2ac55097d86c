#![allow(dead_code)]

use payment_participant::application::processor::TransactionProcessor;
use payment_participant::domain::balance::{Amount, Balance, Funds};
use payment_participant::domain::ids::{CustomerId, OrderId, PaymentId};
use payment_participant::domain::payment::{Payment, PaymentStatus};
use payment_participant::domain::ports::{BalanceStore, PaymentStore, Store, UnitOfWork};
use payment_participant::infrastructure::in_memory::InMemoryStore;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;

/// Builds a processor over a fresh in-memory store holding one balance.
pub async fn processor_with_balance(available: Decimal) -> (TransactionProcessor, CustomerId) {
    let store = InMemoryStore::new();
    let customer = CustomerId::generate();
    store
        .open_balance(customer, Funds::new(available).unwrap())
        .await
        .unwrap();
    (TransactionProcessor::new(Box::new(store)), customer)
}

/// Writes a payment directly into the store, bypassing the processor, the
/// way an earlier saga step would have left it.
pub async fn insert_payment(
    processor: &TransactionProcessor,
    customer: CustomerId,
    amount: Decimal,
    status: PaymentStatus,
) -> PaymentId {
    let mut uow = processor.store().begin().await.unwrap();
    uow.lock_balance(customer).await.unwrap();
    let id = uow
        .create_payment(customer, OrderId::generate(), Amount::new(amount).unwrap())
        .await
        .unwrap();
    uow.set_status(id, status).await.unwrap();
    uow.commit().await.unwrap();
    id
}

pub async fn balance(processor: &TransactionProcessor, customer: CustomerId) -> Balance {
    processor
        .store()
        .balance(customer)
        .await
        .unwrap()
        .expect("balance exists")
}

pub async fn payment(processor: &TransactionProcessor, id: PaymentId) -> Payment {
    processor
        .store()
        .payment(id)
        .await
        .unwrap()
        .expect("payment exists")
}

pub async fn assert_balance(
    processor: &TransactionProcessor,
    customer: CustomerId,
    available: Decimal,
    reserved: Decimal,
) {
    let balance = balance(processor, customer).await;
    assert_eq!(
        balance.available.value().normalize(),
        available.normalize(),
        "available"
    );
    assert_eq!(
        balance.reserved.value().normalize(),
        reserved.normalize(),
        "reserved"
    );
}

pub fn write_csv(path: &Path, header: &str, rows: &[String]) -> Result<(), Error> {
    let mut file = File::create(path)?;
    writeln!(file, "{header}")?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    Ok(())
}
