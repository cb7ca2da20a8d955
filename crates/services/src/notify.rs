use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// A background sync call failed; local state was kept.
    NetworkFailure,
    Info,
}

/// Transient, user-visible message (a toast in a graphical front end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn network_failure(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::NetworkFailure,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }
}

/// Side channel for failures that must not interrupt the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Sends notices to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::NetworkFailure => tracing::warn!(notice = %notice.message, "user notice"),
            NoticeKind::Info => tracing::info!(notice = %notice.message, "user notice"),
        }
    }
}

/// Collects notices until a front end drains them.
#[derive(Debug, Clone, Default)]
pub struct QueueNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl QueueNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything queued so far.
    #[must_use]
    pub fn drain(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }
}

impl Notifier for QueueNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut guard) = self.notices.lock() {
            guard.push(notice);
        }
    }
}
