use crate::error::Result;
use crate::orchestrator::RunReport;
use async_trait::async_trait;

pub mod console;
pub mod csv;
pub mod json;

#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn write(&mut self, report: &RunReport) -> Result<()>;
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
