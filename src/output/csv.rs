use super::ReportSink;
use crate::dispatcher::{FailureReason, TriggerOutcome};
use crate::error::Result;
use crate::orchestrator::RunReport;
use async_trait::async_trait;
use std::path::PathBuf;

/// One row per trigger: `video_id,outcome,status,detail,elapsed_ms`.
pub struct CsvOutput {
    writer: csv::Writer<std::fs::File>,
    headers_written: bool,
}

impl CsvOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let writer = csv::Writer::from_path(path)?;

        Ok(Self {
            writer,
            headers_written: false,
        })
    }
}

#[async_trait]
impl ReportSink for CsvOutput {
    async fn write(&mut self, report: &RunReport) -> Result<()> {
        if !self.headers_written {
            self.writer
                .write_record(["video_id", "outcome", "status", "detail", "elapsed_ms"])?;
            self.headers_written = true;
        }

        for record in &report.dispatch.records {
            let (outcome, status, detail) = match &record.outcome {
                TriggerOutcome::Success { status } => ("success", status.to_string(), String::new()),
                TriggerOutcome::Failure(FailureReason::Status(code)) => {
                    ("failure", code.to_string(), String::new())
                }
                TriggerOutcome::Failure(FailureReason::Transport(e))
                | TriggerOutcome::Failure(FailureReason::Worker(e)) => {
                    ("failure", String::new(), e.clone())
                }
            };

            self.writer.write_record([
                record.video_id.as_str(),
                outcome,
                status.as_str(),
                detail.as_str(),
                record.elapsed_ms.to_string().as_str(),
            ])?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
