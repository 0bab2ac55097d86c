use crate::domain::balance::Balance;
use crate::error::Result;
use std::io::Write;

/// Writes balances as `customer,available,reserved` rows.
///
/// Decimals are normalized, so `80.0` is written as `80`.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_balances(&mut self, balances: impl IntoIterator<Item = Balance>) -> Result<()> {
        self.writer
            .write_record(["customer", "available", "reserved"])?;
        for balance in balances {
            self.writer.write_record([
                balance.customer_id.to_string(),
                balance.available.value().normalize().to_string(),
                balance.reserved.value().normalize().to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
