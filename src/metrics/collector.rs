use crate::metrics::snapshot::MetricsSnapshot;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

/// Lock-free dispatch counters shared by every trigger worker.
#[derive(Clone)]
pub struct MetricsCollector {
    triggers_started: Arc<AtomicU64>,
    triggers_success: Arc<AtomicU64>,
    triggers_failed: Arc<AtomicU64>,
    active_workers: Arc<AtomicU64>,
    peak_active_workers: Arc<AtomicU64>,
    total_response_time_ms: Arc<AtomicU64>,
    max_response_time_ms: Arc<AtomicU64>,
    start_time: Arc<Instant>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            triggers_started: Arc::new(AtomicU64::new(0)),
            triggers_success: Arc::new(AtomicU64::new(0)),
            triggers_failed: Arc::new(AtomicU64::new(0)),
            active_workers: Arc::new(AtomicU64::new(0)),
            peak_active_workers: Arc::new(AtomicU64::new(0)),
            total_response_time_ms: Arc::new(AtomicU64::new(0)),
            max_response_time_ms: Arc::new(AtomicU64::new(0)),
            start_time: Arc::new(Instant::now()),
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_active_workers(&self) {
        self.triggers_started.fetch_add(1, Ordering::SeqCst);
        let active = self.active_workers.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active_workers.fetch_max(active, Ordering::SeqCst);
    }

    pub fn decrement_active_workers(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn record_success(&self, duration: Duration) {
        self.triggers_success.fetch_add(1, Ordering::SeqCst);
        self.record_time(duration);
    }

    pub fn record_failure(&self, duration: Duration) {
        self.triggers_failed.fetch_add(1, Ordering::SeqCst);
        self.record_time(duration);
    }

    fn record_time(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.total_response_time_ms.fetch_add(ms, Ordering::SeqCst);
        self.max_response_time_ms.fetch_max(ms, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let success = self.triggers_success.load(Ordering::SeqCst);
        let failed = self.triggers_failed.load(Ordering::SeqCst);
        let completed = success + failed;
        let total_time = self.total_response_time_ms.load(Ordering::SeqCst);

        let success_rate = if completed > 0 {
            (success as f64 / completed as f64) * 100.0
        } else {
            0.0
        };

        let avg_response_time_ms = if completed > 0 {
            total_time / completed
        } else {
            0
        };

        let elapsed = self.start_time.elapsed().as_secs_f64();

        MetricsSnapshot {
            triggers_started: self.triggers_started.load(Ordering::SeqCst),
            triggers_completed: completed,
            triggers_success: success,
            triggers_failed: failed,
            active_workers: self.active_workers.load(Ordering::SeqCst),
            peak_active_workers: self.peak_active_workers.load(Ordering::SeqCst),
            success_rate,
            avg_response_time_ms,
            max_response_time_ms: self.max_response_time_ms.load(Ordering::SeqCst),
            requests_per_second: if elapsed > 0.0 {
                completed as f64 / elapsed
            } else {
                0.0
            },
            elapsed_seconds: elapsed,
        }
    }
}
