//! JSON export functionality

use anyhow::Result;
use fornax_loadtest_core::RunReport;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes run reports as pretty-printed JSON
pub struct JsonExporter;

impl JsonExporter {
    /// Export the full run report to a JSON file
    pub fn export(report: &RunReport, path: impl AsRef<Path>) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        Self::write(report, file)
    }

    /// Write the full run report
    pub fn write<W: Write>(report: &RunReport, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush()?;
        Ok(())
    }

    /// Export the overall summary only (smaller file)
    pub fn export_summary(report: &RunReport, path: impl AsRef<Path>) -> Result<()> {
        let output = serde_json::json!({
            "scenario": report.scenario,
            "namespace": report.namespace,
            "gateway": report.gateway,
            "duration_ms": report.duration_ms(),
            "cycles": report.cycles.len(),
            "interrupted": report.interrupted,
            "failed_apps": report.failed_apps(),
            "create_failures": report.total_create_failures(),
            "summary": report.summary,
        });

        let mut file = File::create(path)?;
        file.write_all(serde_json::to_string_pretty(&output)?.as_bytes())?;

        Ok(())
    }
}
