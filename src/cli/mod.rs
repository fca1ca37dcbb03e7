//! CLI argument parsing and command dispatch

use crate::config::FileConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fornax_loadtest_core::{RunReport, Scenario, ScenarioRunnerBuilder};
use fornax_loadtest_gateways::{build_gateway, GatewayKind};
use fornax_loadtest_report::{CsvExporter, JsonExporter};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fornax-loadtest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a load test
    Run(RunArgs),
    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use the in-memory control plane instead of the API server
    #[arg(long)]
    pub simulate: bool,

    /// Scenario to drive (app_full_cycle, session_full_cycle, session_create)
    #[arg(short, long)]
    pub scenario: Option<Scenario>,

    /// Applications per cycle
    #[arg(long)]
    pub apps: Option<usize>,

    /// Sessions per application
    #[arg(long)]
    pub sessions: Option<usize>,

    /// Test cycles
    #[arg(long)]
    pub cycles: Option<usize>,

    /// Directory for report files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::All)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// report.json and summary.json
    Json,
    /// sessions.csv and summary.csv
    Csv,
    /// Both
    All,
}

impl Cli {
    /// Dispatch the selected subcommand
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args) => run(args).await,
            Commands::Validate { config } => validate(&config).await,
        }
    }
}

impl RunArgs {
    fn apply(&self, config: &mut FileConfig) {
        if self.simulate {
            config.gateway.kind = GatewayKind::Simulated;
        }
        if let Some(scenario) = self.scenario {
            config.test.scenario = scenario;
        }
        if let Some(apps) = self.apps {
            config.test.num_of_apps = apps;
        }
        if let Some(sessions) = self.sessions {
            config.test.num_of_session_per_app = sessions;
        }
        if let Some(cycles) = self.cycles {
            config.test.num_of_test_cycles = cycles;
        }
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => FileConfig::load(path).await?,
        None => {
            let mut config = FileConfig::default();
            config.apply_env_overrides();
            config
        }
    };
    args.apply(&mut config);
    config.validate()?;

    let gateway = build_gateway(&config.gateway).context("failed to build gateway")?;

    info!(
        scenario = %config.test.scenario,
        gateway = gateway.name(),
        namespace = %config.test.namespace,
        apps = config.test.num_of_apps,
        sessions_per_app = config.test.num_of_session_per_app,
        cycles = config.test.num_of_test_cycles,
        "Starting load test"
    );

    let mut runner = ScenarioRunnerBuilder::new()
        .config(config.load_test())
        .gateway(gateway)
        .build()?;
    let report = runner.run_with_signal_handling().await?;

    log_report(&report);

    if let Some(dir) = &args.output {
        write_reports(&report, dir, args.format)?;
    }

    Ok(())
}

async fn validate(path: &Path) -> Result<()> {
    let config = FileConfig::load(path).await?;
    info!(
        path = %path.display(),
        scenario = %config.test.scenario,
        gateway = ?config.gateway.kind,
        "Configuration is valid"
    );
    Ok(())
}

fn log_report(report: &RunReport) {
    if report.interrupted {
        warn!(cycles = report.cycles.len(), "Run interrupted");
    }

    match &report.summary {
        Some(summary) => info!(
            duration_ms = report.duration_ms(),
            total = summary.total,
            success = summary.success,
            timeout = summary.timeout,
            failed = summary.failed,
            pending = summary.pending,
            sessions_per_second = ?summary.sessions_per_second,
            p50_micros = ?summary.setup_latency.as_ref().map(|l| l.p50_micros),
            p90_micros = ?summary.setup_latency.as_ref().map(|l| l.p90_micros),
            p99_micros = ?summary.setup_latency.as_ref().map(|l| l.p99_micros),
            create_failures = report.total_create_failures(),
            failed_apps = report.failed_apps(),
            "Load test finished"
        ),
        None => warn!(
            duration_ms = report.duration_ms(),
            create_failures = report.total_create_failures(),
            failed_apps = report.failed_apps(),
            "Load test finished without sessions"
        ),
    }
}

fn write_reports(report: &RunReport, dir: &Path, format: OutputFormat) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    if matches!(format, OutputFormat::Json | OutputFormat::All) {
        JsonExporter::export(report, dir.join("report.json"))?;
        JsonExporter::export_summary(report, dir.join("summary.json"))?;
    }
    if matches!(format, OutputFormat::Csv | OutputFormat::All) {
        CsvExporter::export(report, dir.join("sessions.csv"))?;
        CsvExporter::export_summary(report, dir.join("summary.csv"))?;
    }

    info!(dir = %dir.display(), format = ?format, "Reports written");
    Ok(())
}
