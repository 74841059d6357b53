use crate::domain::ports::{Ports, SharedNotificationSink, SharedUserStore};
use crate::domain::user::{Notification, NotificationKind};
use crate::error::{LedgerError, Result};
use uuid::Uuid;

/// Stores a notification on the user's record, then hands it to the sink.
#[derive(Clone)]
pub struct Notifier {
    users: SharedUserStore,
    sink: SharedNotificationSink,
}

impl Notifier {
    pub fn new(ports: &Ports) -> Self {
        Self {
            users: ports.users.clone(),
            sink: ports.notifications.clone(),
        }
    }

    /// Owners without a user record (the bank's own reserve accounts) still
    /// reach the sink.
    pub async fn send(&self, notification: Notification) -> Result<()> {
        match self.users.push_notification(notification.clone()).await {
            Ok(()) => {}
            Err(LedgerError::NotFound { .. }) => {
                tracing::debug!(user = %notification.user_id, "No user record, notification not stored");
            }
            Err(e) => return Err(e),
        }
        self.sink.deliver(notification);
        Ok(())
    }

    pub async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        message: impl Into<String>,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        self.send(Notification::new(user_id, kind, message, at)).await
    }
}
