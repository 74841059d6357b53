use crate::config::ReserveAccounts;
use crate::domain::account::{Account, AccountType, is_valid_account_number};
use crate::domain::money::Currency;
use crate::domain::ports::Ports;
use crate::domain::user::User;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use uuid::Uuid;

/// One row of an accounts seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSeed {
    pub number: String,
    /// Free-form owner label; rows sharing a label share a user.
    pub owner: String,
    pub phone: Option<String>,
    pub currency: Currency,
    pub balance: Decimal,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub reserve: bool,
}

pub struct AccountReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AccountReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn seeds(self) -> impl Iterator<Item = Result<AccountSeed>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}

/// What seeding produced: the reserve map for the engines and the owner
/// labels for reporting.
#[derive(Debug, Default)]
pub struct SeededLedger {
    pub reserves: ReserveAccounts,
    pub owners: HashMap<Uuid, String>,
}

impl SeededLedger {
    pub fn owner_label(&self, owner_id: Uuid) -> &str {
        self.owners.get(&owner_id).map_or("bank", String::as_str)
    }
}

/// Creates users and accounts from seed rows.
///
/// Reserve rows are owned by the bank and registered as the reserve for their
/// currency. An owner whose rows mark no default gets their first account as
/// default.
pub async fn seed_ledger(ports: &Ports, seeds: Vec<AccountSeed>) -> Result<SeededLedger> {
    let mut ledger = SeededLedger::default();
    let mut users: HashMap<String, User> = HashMap::new();
    let mut accounts: Vec<Account> = Vec::with_capacity(seeds.len());

    for seed in seeds {
        if !is_valid_account_number(&seed.number) {
            return Err(LedgerError::ValidationError(format!(
                "Account number '{}' must be 16 digits",
                seed.number
            )));
        }
        if seed.balance < Decimal::ZERO {
            return Err(LedgerError::ValidationError(format!(
                "Account {} has a negative opening balance",
                seed.number
            )));
        }
        if accounts.iter().any(|a| a.number == seed.number) {
            return Err(LedgerError::already_exists(
                crate::error::Entity::Account,
                seed.number,
            ));
        }

        // A persistent store may already hold this account from an earlier run.
        if let Some(existing) = ports.accounts.find_by_number(&seed.number).await? {
            tracing::debug!(account = %existing.number, "Account already stored, seed row skipped");
            if seed.reserve {
                ledger.reserves.insert(existing.currency, existing.id);
            } else {
                ledger.owners.insert(existing.owner_id, seed.owner);
            }
            continue;
        }

        if seed.reserve {
            let account = Account::reserve(seed.number, seed.currency, seed.balance);
            ledger.reserves.insert(seed.currency, account.id);
            accounts.push(account);
            continue;
        }

        let user = users.entry(seed.owner.clone()).or_insert_with(|| {
            User::new(seed.phone.clone().unwrap_or_default())
        });
        if user.phone.is_empty()
            && let Some(phone) = &seed.phone
        {
            user.phone = phone.clone();
        }
        ledger.owners.insert(user.id, seed.owner.clone());

        let mut account = Account::new(user.id, seed.number, seed.currency, AccountType::Current)
            .with_balance(seed.balance);
        account.is_default = seed.default;
        accounts.push(account);
    }

    for user in users.values() {
        let owned: Vec<&mut Account> = accounts
            .iter_mut()
            .filter(|a| a.owner_id == user.id)
            .collect();
        let defaults = owned.iter().filter(|a| a.is_default).count();
        if defaults != 1 {
            // Keep exactly one: the first flagged, or else the first listed.
            let keep = owned.iter().position(|a| a.is_default).unwrap_or(0);
            for (i, account) in owned.into_iter().enumerate() {
                account.is_default = i == keep;
            }
        }
    }

    for user in users.into_values() {
        ports.users.store(user).await?;
    }
    ports.accounts.store_all(accounts).await?;

    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryPorts;
    use rust_decimal_macros::dec;

    const SEED: &str = "number,owner,phone,currency,balance,default,reserve\n\
                        9000000000000001,bank,,AMD,1000000,false,true\n\
                        1000000000000001,alice,+37491000001,AMD,500,false,false\n\
                        1000000000000002,alice,,USD,10,true,false\n\
                        1000000000000003,bob,+37491000002,AMD,200,false,false";

    #[tokio::test]
    async fn test_seed_ledger() {
        let ports = InMemoryPorts::new().into_ports();
        let seeds: Vec<AccountSeed> = AccountReader::new(SEED.as_bytes())
            .seeds()
            .collect::<Result<_>>()
            .unwrap();

        let ledger = seed_ledger(&ports, seeds).await.unwrap();

        let reserve_id = ledger.reserves.get(Currency::Amd).unwrap();
        let reserve = ports.accounts.get(reserve_id).await.unwrap().unwrap();
        assert_eq!(reserve.balance, dec!(1000000));
        assert_eq!(ledger.owner_label(reserve.owner_id), "bank");

        let alice = ports.users.find_by_phone("+37491000001").await.unwrap().unwrap();
        let defaults: Vec<String> = ports
            .accounts
            .find_by_owner(alice.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.is_default)
            .map(|a| a.number)
            .collect();
        assert_eq!(defaults, vec!["1000000000000002"]);

        // Bob marked no default, so his only account becomes it.
        let bob = ports.users.find_by_phone("+37491000002").await.unwrap().unwrap();
        assert!(ports.accounts.find_by_owner(bob.id).await.unwrap()[0].is_default);
        assert_eq!(ledger.owner_label(bob.id), "bob");
    }

    #[tokio::test]
    async fn test_seed_rejects_malformed_numbers() {
        let ports = InMemoryPorts::new().into_ports();
        let seeds = vec![AccountSeed {
            number: "12".into(),
            owner: "x".into(),
            phone: None,
            currency: Currency::Amd,
            balance: dec!(1),
            default: true,
            reserve: false,
        }];
        assert!(matches!(
            seed_ledger(&ports, seeds).await,
            Err(LedgerError::ValidationError(_))
        ));
    }
}
