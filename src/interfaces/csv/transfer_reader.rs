use crate::domain::endpoint::{EndpointDescriptor, EndpointKind};
use crate::domain::money::{Amount, Currency};
use crate::domain::transaction::TransferRequest;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of a transfers file.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRow {
    pub from: String,
    pub from_type: EndpointKind,
    pub to: String,
    pub to_type: EndpointKind,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: Option<String>,
}

impl TryFrom<TransferRow> for TransferRequest {
    type Error = LedgerError;

    fn try_from(row: TransferRow) -> Result<Self> {
        Ok(TransferRequest {
            from: EndpointDescriptor::new(row.from_type, row.from),
            to: EndpointDescriptor::new(row.to_type, row.to),
            amount: Amount::new(row.amount)?,
            currency: row.currency,
            description: row.description.unwrap_or_default(),
        })
    }
}

/// Reads transfer requests from a CSV source.
///
/// Whitespace is trimmed and a missing trailing description is accepted.
pub struct TransferReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransferReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and validates requests, one per row.
    pub fn requests(self) -> impl Iterator<Item = Result<TransferRequest>> {
        self.reader.into_deserialize::<TransferRow>().map(|row| {
            let row = row.map_err(LedgerError::from)?;
            TransferRequest::try_from(row)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "from,from_type,to,to_type,amount,currency,description\n\
                    1000000000000001, ACCOUNT, +37491000002, PHONE, 100.5, AMD, rent\n\
                    4000000000000001, CARD, 1000000000000002, ACCOUNT, 1, USD";
        let results: Vec<Result<TransferRequest>> =
            TransferReader::new(data.as_bytes()).requests().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.to, EndpointDescriptor::Phone("+37491000002".into()));
        assert_eq!(first.amount.value(), dec!(100.5));
        assert_eq!(first.description, "rent");

        let second = results[1].as_ref().unwrap();
        assert_eq!(second.from.kind(), EndpointKind::Card);
        assert_eq!(second.description, "");
    }

    #[test]
    fn test_reader_rejects_bad_rows() {
        let data = "from,from_type,to,to_type,amount,currency,description\n\
                    1, WIRE, 2, ACCOUNT, 1, AMD, x\n\
                    1, ACCOUNT, 2, ACCOUNT, -5, AMD, x";
        let results: Vec<Result<TransferRequest>> =
            TransferReader::new(data.as_bytes()).requests().collect();

        assert!(matches!(results[0], Err(LedgerError::Csv(_))));
        assert!(matches!(results[1], Err(LedgerError::ValidationError(_))));
    }
}
