//! Fire-and-forget user notifications

use std::fmt;

use log::{error, info, warn};
use tokio::sync::mpsc;

/// Title used on every transaction notification.
pub const TX_NOTIFICATION_TITLE: &str = "Tx Notification";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub title: String,
}

impl Notification {
    pub fn tx(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            title: TX_NOTIFICATION_TITLE.to_string(),
        }
    }
}

/// Must not block; callers never wait on delivery.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, n: Notification) {
        match n.severity {
            Severity::Success | Severity::Info => info!("[{}] {}", n.title, n.message),
            Severity::Warning => warn!("[{}] {}", n.title, n.message),
            Severity::Error => error!("[{}] {}", n.title, n.message),
        }
    }
}

/// Forwards notifications to a renderer task. Dropped receivers are ignored.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}
