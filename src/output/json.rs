use super::ReportSink;
use crate::error::Result;
use crate::orchestrator::RunReport;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Writes each report as one pretty-printed JSON document.
pub struct JsonOutput {
    writer: BufWriter<File>,
}

impl JsonOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

#[async_trait]
impl ReportSink for JsonOutput {
    async fn write(&mut self, report: &RunReport) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, report)?;
        writeln!(self.writer)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
