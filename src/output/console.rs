use super::ReportSink;
use crate::catalog::VideoId;
use crate::dispatcher::TriggerOutcome;
use crate::error::{Error, Result};
use crate::orchestrator::RunReport;
use async_trait::async_trait;
use indicatif::MultiProgress;
use std::sync::Arc;

/// `1234567` -> `"1,234,567"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_ids(ids: &[VideoId]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("'{}'", id)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Human-readable run summary.
pub fn render_report(report: &RunReport) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Total Viewers Watching Live: {}",
            group_thousands(report.discovery.scan.total_viewers)
        ),
        format!("Live Video IDs: {}", format_ids(&report.discovery.targets)),
    ];

    for record in &report.dispatch.records {
        lines.push(match &record.outcome {
            TriggerOutcome::Success { .. } => format!("✅ Started scraper for {}", record.video_id),
            TriggerOutcome::Failure(reason) => {
                format!("❌ Failed to start scraper for {} ({})", record.video_id, reason)
            }
        });
    }

    lines.push(format!(
        "💻 CPU Usage: {:.1}% | RAM Usage: {:.1}%",
        report.resources.cpu_percent, report.resources.mem_percent
    ));
    lines
}

pub struct ConsoleOutput {
    multi: Option<Arc<MultiProgress>>,
}

impl ConsoleOutput {
    pub fn new(multi: Option<Arc<MultiProgress>>) -> Self {
        Self { multi }
    }

    pub fn println(&self, line: &str) -> Result<()> {
        if let Some(multi) = &self.multi {
            multi.println(line).map_err(|e| Error::Internal(e.to_string()))?;
        } else {
            println!("{}", line);
        }
        Ok(())
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl ReportSink for ConsoleOutput {
    async fn write(&mut self, report: &RunReport) -> Result<()> {
        for line in render_report(report) {
            self.println(&line)?;
        }
        Ok(())
    }
}
