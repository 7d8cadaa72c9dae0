//! # Progress Reporting
//!
//! Progress callbacks for long-running batches, plus a threshold notifier
//! that fires a side-effect each time another configured fraction of the
//! total completes. Delivery of notifications is pluggable; the shipped
//! implementation logs.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

/// Progress snapshot reported after each persisted trace.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub traces_collected: u64,
    pub total_traces: u64,
    pub completion_pct: f64,
    pub elapsed_seconds: f64,
}

/// Progress callback trait for long-running batches.
pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, snapshot: &ProgressSnapshot);
}

/// Side-effect fired at progress thresholds.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier that writes to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!("{message}");
    }
}

/// Fires the wrapped notifier each time `interval` (a fraction of the
/// total, e.g. 0.1 for every 10%) worth of traces has been collected since
/// the last notification. An interval of zero disables notifications.
pub struct ThresholdReporter {
    interval: f64,
    last_notified: AtomicU64,
    notifier: Box<dyn Notifier>,
}

impl ThresholdReporter {
    pub fn new(interval: f64, notifier: Box<dyn Notifier>) -> Self {
        Self {
            interval,
            last_notified: AtomicU64::new(0),
            notifier,
        }
    }
}

impl ProgressReporter for ThresholdReporter {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        if self.interval <= 0.0 || snapshot.total_traces == 0 {
            return;
        }
        let step = (self.interval * snapshot.total_traces as f64).max(1.0) as u64;
        let last = self.last_notified.load(Ordering::Relaxed);
        if snapshot.traces_collected >= last + step {
            self.notifier.notify(&format!(
                "collection is {:.0}% done ({}/{} traces)",
                snapshot.completion_pct, snapshot.traces_collected, snapshot.total_traces
            ));
            self.last_notified
                .store(snapshot.traces_collected, Ordering::Relaxed);
        }
    }
}
