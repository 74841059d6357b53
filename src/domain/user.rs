use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// The slice of a bank customer the ledger cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub phone: String,
    /// Creditworthiness tier; a tier cannot be deleted while referenced here.
    pub tier_id: Option<Uuid>,
    pub notifications: Vec<Notification>,
}

impl User {
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone: phone.into(),
            tier_id: None,
            notifications: Vec::new(),
        }
    }

    pub fn with_tier(mut self, tier_id: Uuid) -> Self {
        self.tier_id = Some(tier_id);
        self
    }
}

/// A payment card bound to one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub number: String,
    pub account_id: Uuid,
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TransferDenied,
    LoanPaid,
    LoanDefaulted,
    DepositClosed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            message: message.into(),
            created_at,
        }
    }
}
