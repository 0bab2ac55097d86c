use crate::domain::ids::CustomerId;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// Opening funds for one customer.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct BalanceRecord {
    pub customer: CustomerId,
    pub available: Decimal,
}

/// Reads opening balances from a CSV source with a `customer, available`
/// header.
pub struct BalanceReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> BalanceReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    pub fn records(self) -> impl Iterator<Item = Result<BalanceRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
