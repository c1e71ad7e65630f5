use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, System};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    pub cpu_percent: f32,
    pub mem_percent: f32,
}

#[async_trait]
pub trait ResourceProbe: Send + Sync {
    async fn sample(&self) -> Result<ResourceSample>;
}

/// Host-wide CPU and memory utilization via sysinfo.
pub struct SystemMonitor {
    window: Duration,
}

impl SystemMonitor {
    pub fn new(window: Duration) -> Self {
        Self {
            window: window.max(MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl ResourceProbe for SystemMonitor {
    async fn sample(&self) -> Result<ResourceSample> {
        let mut sys = System::new();

        // CPU usage is a delta between two refreshes.
        sys.refresh_cpu_usage();
        tokio::time::sleep(self.window).await;
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let total = sys.total_memory();
        if total == 0 {
            return Err(Error::MonitorUnavailable("total memory reported as zero".to_string()));
        }

        let sample = ResourceSample {
            cpu_percent: sys.global_cpu_usage(),
            mem_percent: (sys.used_memory() as f64 / total as f64 * 100.0) as f32,
        };
        log::debug!("Resource sample over {:?}: {:?}", self.window, sample);
        Ok(sample)
    }
}
