use crate::domain::endpoint::EndpointKind;
use crate::domain::money::Currency;
use crate::domain::transaction::Transaction;
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct LedgerRow<'a> {
    id: Uuid,
    timestamp: DateTime<Utc>,
    from: &'a str,
    from_type: EndpointKind,
    to: &'a str,
    to_type: EndpointKind,
    amount: Decimal,
    currency: Currency,
    done: bool,
    description: &'a str,
}

impl<'a> From<&'a Transaction> for LedgerRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            id: tx.id,
            timestamp: tx.timestamp,
            from: &tx.from.value,
            from_type: tx.from.kind,
            to: &tx.to.value,
            to_type: tx.to.kind,
            amount: tx.amount,
            currency: tx.currency,
            done: tx.done,
            description: &tx.description,
        }
    }
}

/// Writes the transaction log, completed and denied entries alike.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_transactions(&mut self, transactions: &[Transaction]) -> Result<()> {
        for tx in transactions {
            self.writer.serialize(LedgerRow::from(tx))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
