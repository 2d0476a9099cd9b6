//! "Too many files" notifications.
//!
//! Delivery belongs to the [`Notifier`] implementation; the coordinator only
//! decides when to call it, at most once per local calendar day.

use chrono::NaiveDate;
use std::sync::Mutex;
use tracing::warn;

/// Receives the threshold-exceeded signal.
pub trait Notifier: Send + Sync {
    fn notify_too_many_files(&self, count: usize, threshold: usize);
}

/// Writes the notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_too_many_files(&self, count: usize, threshold: usize) {
        warn!(
            "Your desktop has {} files waiting for cleanup (more than {})",
            count, threshold
        );
    }
}

/// Drops notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify_too_many_files(&self, _count: usize, _threshold: usize) {}
}

/// Lets at most one notification through per calendar day.
#[derive(Debug, Default)]
pub struct DailyNotifyGate {
    last_sent: Mutex<Option<NaiveDate>>,
}

impl DailyNotifyGate {
    /// Returns true, and records `today`, if nothing was sent on `today` yet.
    pub fn try_pass(&self, today: NaiveDate) -> bool {
        let mut last_sent = self
            .last_sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *last_sent == Some(today) {
            return false;
        }
        *last_sent = Some(today);
        true
    }
}
