use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// The five ways a caller can name one side of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum EndpointKind {
    Account,
    Card,
    Phone,
    QrAccount,
    QrCard,
}

/// The kinds a resolved endpoint can be stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentKind {
    Account,
    Card,
}

impl From<InstrumentKind> for EndpointKind {
    fn from(kind: InstrumentKind) -> Self {
        match kind {
            InstrumentKind::Account => EndpointKind::Account,
            InstrumentKind::Card => EndpointKind::Card,
        }
    }
}

/// Pre-resolution endpoint. QR variants carry a signed capability token
/// instead of a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "variant", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointDescriptor {
    Account(String),
    Card(String),
    Phone(String),
    QrAccount(String),
    QrCard(String),
}

impl EndpointDescriptor {
    pub fn new(kind: EndpointKind, value: impl Into<String>) -> Self {
        let value = value.into();
        match kind {
            EndpointKind::Account => EndpointDescriptor::Account(value),
            EndpointKind::Card => EndpointDescriptor::Card(value),
            EndpointKind::Phone => EndpointDescriptor::Phone(value),
            EndpointKind::QrAccount => EndpointDescriptor::QrAccount(value),
            EndpointKind::QrCard => EndpointDescriptor::QrCard(value),
        }
    }

    pub fn kind(&self) -> EndpointKind {
        match self {
            EndpointDescriptor::Account(_) => EndpointKind::Account,
            EndpointDescriptor::Card(_) => EndpointKind::Card,
            EndpointDescriptor::Phone(_) => EndpointKind::Phone,
            EndpointDescriptor::QrAccount(_) => EndpointKind::QrAccount,
            EndpointDescriptor::QrCard(_) => EndpointKind::QrCard,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            EndpointDescriptor::Account(v)
            | EndpointDescriptor::Card(v)
            | EndpointDescriptor::Phone(v)
            | EndpointDescriptor::QrAccount(v)
            | EndpointDescriptor::QrCard(v) => v,
        }
    }
}

/// What a successful resolution produces: a number of an account or card,
/// and the user who owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEndpoint {
    pub number: String,
    pub kind: InstrumentKind,
    pub owner_id: Uuid,
}

/// One side of a persisted transaction.
///
/// Completed transactions always hold the canonical form. Denied ones keep
/// whatever could be learned about the side, down to the raw descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub value: String,
    pub kind: EndpointKind,
    pub owner_id: Option<Uuid>,
}

impl EndpointRecord {
    pub fn unresolved(descriptor: &EndpointDescriptor) -> Self {
        Self {
            value: descriptor.value().to_string(),
            kind: descriptor.kind(),
            owner_id: None,
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.owner_id.is_some() && matches!(self.kind, EndpointKind::Account | EndpointKind::Card)
    }
}

impl From<CanonicalEndpoint> for EndpointRecord {
    fn from(endpoint: CanonicalEndpoint) -> Self {
        Self {
            value: endpoint.number,
            kind: endpoint.kind.into(),
            owner_id: Some(endpoint.owner_id),
        }
    }
}
