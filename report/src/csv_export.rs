//! CSV export functionality

use anyhow::Result;
use csv::Writer;
use fornax_loadtest_core::RunReport;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes per-session and summary CSV files
pub struct CsvExporter;

impl CsvExporter {
    /// Export one row per session to a CSV file
    pub fn export(report: &RunReport, path: impl AsRef<Path>) -> Result<()> {
        Self::write_sessions(report, File::create(path)?)
    }

    /// Write one row per session
    pub fn write_sessions<W: Write>(report: &RunReport, writer: W) -> Result<()> {
        let mut wtr = Writer::from_writer(writer);

        wtr.write_record([
            "session",
            "application",
            "status",
            "creation_time_micro",
            "available_time_micro",
            "setup_latency_micros",
        ])?;

        for session in &report.sessions {
            wtr.write_record([
                session.name().to_string(),
                session.application().to_string(),
                session.status().to_string(),
                session.creation_time_micro().to_string(),
                session.available_time_micro().to_string(),
                session
                    .setup_latency_micros()
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Export summary statistics to CSV
    pub fn export_summary(report: &RunReport, path: impl AsRef<Path>) -> Result<()> {
        Self::write_summary(report, File::create(path)?)
    }

    /// Write `metric,value` rows for the overall summary
    pub fn write_summary<W: Write>(report: &RunReport, writer: W) -> Result<()> {
        let mut wtr = Writer::from_writer(writer);

        wtr.write_record(["metric", "value"])?;
        wtr.write_record(["scenario", &report.scenario.to_string()])?;
        wtr.write_record(["cycles", &report.cycles.len().to_string()])?;
        wtr.write_record(["duration_ms", &report.duration_ms().to_string()])?;
        wtr.write_record(["interrupted", &report.interrupted.to_string()])?;
        wtr.write_record(["failed_apps", &report.failed_apps().to_string()])?;
        wtr.write_record([
            "create_failures",
            &report.total_create_failures().to_string(),
        ])?;

        if let Some(summary) = &report.summary {
            wtr.write_record(["total_sessions", &summary.total.to_string()])?;
            wtr.write_record(["available_sessions", &summary.success.to_string()])?;
            wtr.write_record(["closed_sessions", &summary.failed.to_string()])?;
            wtr.write_record(["timeout_sessions", &summary.timeout.to_string()])?;
            wtr.write_record(["pending_sessions", &summary.pending.to_string()])?;
            wtr.write_record([
                "success_rate_percent",
                &format!("{:.2}", summary.success_rate() * 100.0),
            ])?;
            if let Some(rate) = summary.sessions_per_second {
                wtr.write_record(["sessions_per_second", &rate.to_string()])?;
            }

            if let Some(latency) = &summary.setup_latency {
                wtr.write_record(["min_setup_micros", &latency.min_micros.to_string()])?;
                wtr.write_record(["p50_setup_micros", &latency.p50_micros.to_string()])?;
                wtr.write_record(["p90_setup_micros", &latency.p90_micros.to_string()])?;
                wtr.write_record(["p99_setup_micros", &latency.p99_micros.to_string()])?;
                wtr.write_record(["max_setup_micros", &latency.max_micros.to_string()])?;
                wtr.write_record(["p99_session", &latency.p99_session])?;
            }
        }

        wtr.flush()?;
        Ok(())
    }
}
