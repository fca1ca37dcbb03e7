//! Report export for load-test runs
//!
//! This crate provides exporters for:
//!
//! - JSON (the full run report)
//! - CSV (per-session rows and a metric/value summary)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod csv_export;
pub mod json_export;

pub use csv_export::CsvExporter;
pub use json_export::JsonExporter;
