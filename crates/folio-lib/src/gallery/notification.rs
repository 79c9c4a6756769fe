use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A transient toast shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Notifications in the order they were raised, each visible for `ttl`.
#[derive(Debug, Clone)]
pub struct NotificationLog {
    ttl: Duration,
    entries: Vec<Notification>,
}

impl NotificationLog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.push_at(level, message, Utc::now());
    }

    pub fn push_at(&mut self, level: NotificationLevel, message: impl Into<String>, at: DateTime<Utc>) {
        let message = message.into();
        match level {
            NotificationLevel::Error => tracing::warn!(%message, "gallery notification"),
            _ => tracing::debug!(%message, "gallery notification"),
        }
        self.entries.push(Notification {
            level,
            message,
            created_at: at,
        });
    }

    /// Notifications still visible at `now`; expired ones are pruned.
    pub fn active(&mut self, now: DateTime<Utc>) -> &[Notification] {
        let ttl = self.ttl;
        self.entries.retain(|n| now - n.created_at < ttl);
        &self.entries
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.last()
    }

    /// Hand every pending notification to the caller, leaving the log empty.
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.entries)
    }
}
