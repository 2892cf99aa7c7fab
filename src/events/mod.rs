pub mod notifier;

// Re-export key types for convenience
pub use notifier::{ChannelNotifier, Notification, NotificationKind, Notifier};
