use crate::domain::ids::{CustomerId, OrderId};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Reserve,
    Complete,
    Cancel,
}

/// One row of an event stream.
///
/// Complete and cancel rows name the order rather than the payment, since
/// payment ids are only known once the reservation has been applied.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct EventRecord {
    pub r#type: EventType,
    pub customer: CustomerId,
    pub order: OrderId,
    pub amount: Option<Decimal>,
}

/// Reads event records from a CSV source.
///
/// Handles whitespace trimming and flexible record lengths, so the trailing
/// amount column may be omitted on complete and cancel rows.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes event records.
    pub fn records(self) -> impl Iterator<Item = Result<EventRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const CUSTOMER: &str = "6f1c1c4e-2f0b-4a53-9d62-0d3b8d1f6a10";
    const ORDER: &str = "0b7c3f8e-9a51-4e3c-8f0d-5a2e6b1c9d47";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "type, customer, order, amount\nreserve, {CUSTOMER}, {ORDER}, 20.0\ncomplete, {CUSTOMER}, {ORDER},\ncancel, {CUSTOMER}, {ORDER}"
        );
        let reader = EventReader::new(data.as_bytes());
        let results: Vec<Result<EventRecord>> = reader.records().collect();

        assert_eq!(results.len(), 3);
        let reserve = results[0].as_ref().unwrap();
        assert_eq!(reserve.r#type, EventType::Reserve);
        assert_eq!(reserve.customer, CUSTOMER.parse().unwrap());
        assert_eq!(reserve.amount, Some(dec!(20.0)));

        let complete = results[1].as_ref().unwrap();
        assert_eq!(complete.r#type, EventType::Complete);
        assert_eq!(complete.amount, None);

        let cancel = results[2].as_ref().unwrap();
        assert_eq!(cancel.r#type, EventType::Cancel);
        assert_eq!(cancel.order, ORDER.parse().unwrap());
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = format!("type, customer, order, amount\nrefund, {CUSTOMER}, {ORDER}, 1.0\nreserve, 42, {ORDER}, 1.0");
        let reader = EventReader::new(data.as_bytes());
        let results: Vec<Result<EventRecord>> = reader.records().collect();

        assert!(results[0].is_err());
        assert!(results[1].is_err());
    }
}
