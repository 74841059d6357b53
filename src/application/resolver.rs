use crate::domain::account::Account;
use crate::domain::endpoint::{CanonicalEndpoint, EndpointDescriptor, InstrumentKind};
use crate::domain::ports::{
    Ports, SharedAccountStore, SharedCardStore, SharedTokenVerifier, SharedUserStore,
};
use crate::error::{Entity, LedgerError, Result};

/// An endpoint after resolution: the account money moves through, and the
/// canonical form stored on the transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEndpoint {
    pub account: Account,
    pub canonical: CanonicalEndpoint,
}

/// Turns any of the five endpoint variants into a concrete account.
///
/// Resolution only reads; the returned account is a snapshot and callers that
/// mutate balances must re-read it under the account lock.
pub struct TransactionEntityResolver {
    accounts: SharedAccountStore,
    cards: SharedCardStore,
    users: SharedUserStore,
    tokens: SharedTokenVerifier,
}

impl TransactionEntityResolver {
    pub fn new(ports: &Ports) -> Self {
        Self {
            accounts: ports.accounts.clone(),
            cards: ports.cards.clone(),
            users: ports.users.clone(),
            tokens: ports.tokens.clone(),
        }
    }

    pub async fn resolve(&self, descriptor: &EndpointDescriptor) -> Result<ResolvedEndpoint> {
        match descriptor {
            EndpointDescriptor::Account(number) => self.by_account_number(number).await,
            EndpointDescriptor::Card(number) => self.by_card_number(number).await,
            EndpointDescriptor::Phone(phone) => self.by_phone(phone).await,
            EndpointDescriptor::QrAccount(token) => {
                self.by_token(token, InstrumentKind::Account).await
            }
            EndpointDescriptor::QrCard(token) => self.by_token(token, InstrumentKind::Card).await,
        }
    }

    async fn by_account_number(&self, number: &str) -> Result<ResolvedEndpoint> {
        let account = self.live_account_by_number(number).await?;
        Ok(ResolvedEndpoint {
            canonical: CanonicalEndpoint {
                number: account.number.clone(),
                kind: InstrumentKind::Account,
                owner_id: account.owner_id,
            },
            account,
        })
    }

    async fn by_card_number(&self, number: &str) -> Result<ResolvedEndpoint> {
        let card = self
            .cards
            .find_by_number(number)
            .await?
            .ok_or_else(|| LedgerError::not_found(Entity::Card, number))?;
        let account = self
            .accounts
            .get(card.account_id)
            .await?
            .filter(|a| !a.deleted)
            .ok_or_else(|| LedgerError::not_found(Entity::Account, card.account_id))?;

        Ok(ResolvedEndpoint {
            canonical: CanonicalEndpoint {
                number: card.number,
                kind: InstrumentKind::Card,
                owner_id: account.owner_id,
            },
            account,
        })
    }

    async fn by_phone(&self, phone: &str) -> Result<ResolvedEndpoint> {
        let user = self
            .users
            .find_by_phone(phone)
            .await?
            .ok_or_else(|| LedgerError::not_found(Entity::User, phone))?;
        let account = self
            .accounts
            .find_by_owner(user.id)
            .await?
            .into_iter()
            .find(|a| a.is_default && !a.deleted)
            .ok_or_else(|| LedgerError::not_found(Entity::Account, format!("default of {phone}")))?;

        Ok(ResolvedEndpoint {
            canonical: CanonicalEndpoint {
                number: account.number.clone(),
                kind: InstrumentKind::Account,
                owner_id: user.id,
            },
            account,
        })
    }

    async fn by_token(&self, token: &str, expected: InstrumentKind) -> Result<ResolvedEndpoint> {
        let payload = self.tokens.verify(token)?;
        if payload.kind != expected {
            return Err(LedgerError::TokenInvalid(format!(
                "token encodes {} but was presented as {expected}",
                payload.kind
            )));
        }
        match payload.kind {
            InstrumentKind::Account => self.by_account_number(&payload.number).await,
            InstrumentKind::Card => self.by_card_number(&payload.number).await,
        }
    }

    /// Soft-deleted accounts are treated as absent.
    pub async fn live_account_by_number(&self, number: &str) -> Result<Account> {
        self.accounts
            .find_by_number(number)
            .await?
            .filter(|a| !a.deleted)
            .ok_or_else(|| LedgerError::not_found(Entity::Account, number))
    }
}
