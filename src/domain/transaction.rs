use crate::domain::endpoint::{CanonicalEndpoint, EndpointDescriptor, EndpointRecord};
use crate::domain::money::{Amount, Currency};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marker placed between the caller's description and the failure reason
/// of a denied transaction.
pub const DENIED_MARKER: &str = " | DENIED: ";

/// A request to move money, as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: EndpointDescriptor,
    pub to: EndpointDescriptor,
    pub amount: Amount,
    pub currency: Currency,
    pub description: String,
}

impl TransferRequest {
    /// Account-to-account request, the shape every internal flow uses.
    pub fn between_accounts(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: Amount,
        currency: Currency,
        description: impl Into<String>,
    ) -> Self {
        Self {
            from: EndpointDescriptor::Account(from.into()),
            to: EndpointDescriptor::Account(to.into()),
            amount,
            currency,
            description: description.into(),
        }
    }
}

/// Ledger entry. Append-only: created once, never mutated after it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub from: EndpointRecord,
    pub to: EndpointRecord,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// `false` marks a denied attempt; its description then ends with the reason.
    pub done: bool,
}

impl Transaction {
    pub fn completed(
        from: CanonicalEndpoint,
        to: CanonicalEndpoint,
        amount: Amount,
        currency: Currency,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from: from.into(),
            to: to.into(),
            amount: amount.value(),
            currency,
            description: description.into(),
            timestamp,
            done: true,
        }
    }

    pub fn denied(
        from: EndpointRecord,
        to: EndpointRecord,
        amount: Amount,
        currency: Currency,
        description: &str,
        reason: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let reason = if reason.trim().is_empty() {
            "unknown failure"
        } else {
            reason
        };
        Self {
            id: Uuid::new_v4(),
            from,
            to,
            amount: amount.value(),
            currency,
            description: format!("{description}{DENIED_MARKER}{reason}"),
            timestamp,
            done: false,
        }
    }

    /// The reason annotated on a denied transaction.
    pub fn failure_reason(&self) -> Option<&str> {
        if self.done {
            return None;
        }
        self.description
            .rsplit_once(DENIED_MARKER)
            .map(|(_, reason)| reason)
    }

    /// True if `user_id` owns either side.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.from.owner_id == Some(user_id) || self.to.owner_id == Some(user_id)
    }
}
