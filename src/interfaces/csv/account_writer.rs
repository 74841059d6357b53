use crate::domain::account::Account;
use crate::domain::money::Currency;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct BalanceRow<'a> {
    number: &'a str,
    owner: &'a str,
    currency: Currency,
    balance: Decimal,
}

/// Writes final balances as `number,owner,currency,balance`.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// `owner` maps an owner id to the label printed for it.
    pub fn write_accounts<'a, F>(&mut self, accounts: &[Account], owner: F) -> Result<()>
    where
        F: Fn(&Account) -> &'a str,
    {
        for account in accounts {
            self.writer.serialize(BalanceRow {
                number: &account.number,
                owner: owner(account),
                currency: account.currency,
                balance: account.balance.normalize(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::AccountType;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_writes_header_and_rows() {
        let account = Account::new(Uuid::new_v4(), "1000000000000001", Currency::Amd, AccountType::Current)
            .with_balance(dec!(400.00));

        let mut out = Vec::new();
        AccountWriter::new(&mut out)
            .write_accounts(&[account], |_| "alice")
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "number,owner,currency,balance\n1000000000000001,alice,AMD,400\n"
        );
    }
}
