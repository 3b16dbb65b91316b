/// Severity attached to an operator-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationLevel::Info => write!(f, "info"),
            NotificationLevel::Success => write!(f, "success"),
            NotificationLevel::Error => write!(f, "error"),
        }
    }
}

/// Receives operator-facing messages. Fire-and-forget.
pub trait NotificationSink {
    fn notify(&self, message: &str, level: NotificationLevel);
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn notify(&self, message: &str, level: NotificationLevel) {
        (**self).notify(message, level)
    }
}

/// Writes notifications to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, message: &str, level: NotificationLevel) {
        match level {
            NotificationLevel::Error => tracing::error!(%level, "{}", message),
            NotificationLevel::Success | NotificationLevel::Info => {
                tracing::info!(%level, "{}", message)
            }
        }
    }
}
