use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub triggers_started: u64,
    pub triggers_completed: u64,
    pub triggers_success: u64,
    pub triggers_failed: u64,
    pub active_workers: u64,
    pub peak_active_workers: u64,
    pub success_rate: f64,
    pub avg_response_time_ms: u64,
    pub max_response_time_ms: u64,
    pub requests_per_second: f64,
    pub elapsed_seconds: f64,
}
