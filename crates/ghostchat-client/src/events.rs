//! User-facing notifications ("toasts").
//!
//! Mutations report their outcome through a [`Notifier`]. Every notification
//! is logged and broadcast to whatever UI layer subscribed.

use tokio::sync::broadcast;

const NOTIFICATION_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(NotificationLevel::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(NotificationLevel::Error, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(NotificationLevel::Info, message.into());
    }

    fn emit(&self, level: NotificationLevel, message: String) {
        match level {
            NotificationLevel::Error => tracing::warn!(%message, "Notify error"),
            _ => tracing::info!(?level, %message, "Notify"),
        }
        if self.tx.send(Notification { level, message }).is_err() {
            tracing::trace!("No notification subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_in_order() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        notifier.success("Message updated");
        notifier.error("Actor not available");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.level, NotificationLevel::Success);
        assert_eq!(first.message, "Message updated");
        assert_eq!(rx.recv().await.unwrap().level, NotificationLevel::Error);
    }

    #[test]
    fn sending_without_subscribers_is_harmless() {
        Notifier::new().info("nobody listening");
    }
}
