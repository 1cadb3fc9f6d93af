//! User-facing events emitted by the client.
//!
//! Front ends subscribe to render notifications and to react to the
//! "go back to login" request that follows an unrecoverable session loss.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Dismissible notification.
    Notice { level: NoticeLevel, message: String },
    /// The session is gone; navigate to the login entry point.
    RedirectToLogin,
}

/// Broadcast channel for [`SessionEvent`]s.
///
/// Sending with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        debug!(?level, %message, "Notice");
        let _ = self.tx.send(SessionEvent::Notice { level, message });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Error, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Success, message);
    }

    /// Emit [`SessionEvent::RedirectToLogin`] after `delay`, leaving time for
    /// the preceding notice to be seen.
    pub fn schedule_redirect(&self, delay: Duration) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("Redirecting to login");
            let _ = tx.send(SessionEvent::RedirectToLogin);
        })
    }
}
