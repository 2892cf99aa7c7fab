//! Health-monitor notifications for deployment runs.
//!
//! Notifications are fire-and-forget: a notifier never fails the run it
//! reports on.

use crate::error::DirectorError;
use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Reports deployment progress to an external monitoring channel
pub trait Notifier: Send + Sync {
    fn send_start_event(&self, deployment: &str);
    fn send_end_event(&self, deployment: &str);
    fn send_error_event(&self, deployment: &str, error: &DirectorError);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Start,
    End,
    Error,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A notification as delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub deployment: String,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Publishes notifications on an unbounded crossbeam channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: Sender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier together with the receiving end of its channel
    pub fn channel() -> (Self, Receiver<Notification>) {
        let (sender, receiver) = channel::unbounded();
        (Self { sender }, receiver)
    }

    fn publish(&self, kind: NotificationKind, deployment: &str, error: Option<String>) {
        let notification = Notification {
            kind,
            deployment: deployment.to_string(),
            error,
            sent_at: Utc::now(),
        };

        // A missing subscriber is not an error for fire-and-forget delivery
        if self.sender.send(notification).is_err() {
            debug!(deployment = %deployment, kind = %kind, "No notification subscriber, dropping");
        }
    }
}

impl Notifier for ChannelNotifier {
    fn send_start_event(&self, deployment: &str) {
        self.publish(NotificationKind::Start, deployment, None);
    }

    fn send_end_event(&self, deployment: &str) {
        self.publish(NotificationKind::End, deployment, None);
    }

    fn send_error_event(&self, deployment: &str, error: &DirectorError) {
        self.publish(NotificationKind::Error, deployment, Some(error.to_string()));
    }
}
