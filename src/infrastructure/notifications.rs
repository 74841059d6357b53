use crate::domain::ports::NotificationSink;
use crate::domain::user::Notification;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 1024;

/// Fans notifications out over a broadcast channel. Delivery transports
/// subscribe; with no subscribers the notification is dropped after logging.
#[derive(Clone)]
pub struct ChannelNotificationSink {
    tx: broadcast::Sender<Notification>,
}

impl Default for ChannelNotificationSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChannelNotificationSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn deliver(&self, notification: Notification) {
        let user = notification.user_id;
        let kind = notification.kind;
        if self.tx.send(notification).is_err() {
            tracing::debug!(%user, %kind, "No notification subscribers");
        }
    }
}
