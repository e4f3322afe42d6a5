//! alert-monitor — periodic evaluation of hive alert rules.
//!
//! Subcommands:
//! - `run`   — evaluate all alerts on the configured cadence until SIGINT/SIGTERM
//! - `once`  — run a single tick and print its report as JSON
//! - `check` — evaluate a condition payload against a snapshot, offline

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use hivewatch_core::config::{self, parse_duration, Config};
use hivewatch_core::Snapshot;
use hivewatch_monitor::{
    shutdown_channel, AlertMonitor, HttpSnapshotProvider, JsonFileAlertStore, MonitorRunner,
    SnapshotProvider, StaticSnapshotProvider, TickOutcome,
};
use hivewatch_notify::{notifier_from_config, MessageTemplates};
use hivewatch_rules::{evaluate_detailed, parse_conditions};

// ── CLI ─────────────────────────────────────────────────────────────

/// Hive alert monitor — evaluates threshold rules and notifies owners.
#[derive(Parser, Debug)]
#[command(name = "alert-monitor", version, about)]
struct Cli {
    /// Directory holding hivewatch.json.
    #[arg(long, env = "DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Serve snapshots from a JSON file instead of the sensor service.
    #[arg(long, env = "SNAPSHOT_FILE", global = true)]
    snapshots: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the monitor loop until interrupted.
    Run {
        /// Fixed tick interval, e.g. "5m" or "90s".
        #[arg(long)]
        interval: Option<String>,

        /// Cron expression (5 or 6 fields); overrides the interval.
        #[arg(long)]
        cron: Option<String>,

        /// Number of users evaluated concurrently.
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Run a single tick and print the report.
    Once,
    /// Evaluate conditions against a snapshot without touching any store.
    Check {
        /// Condition payload, e.g. '[{"parameter":"temperature","operator":">","threshold":30}]'.
        #[arg(long)]
        conditions: String,

        /// Snapshot as a JSON object, e.g. '{"temperature":35}'.
        #[arg(long)]
        snapshot: String,
    },
}

// ── Wiring ──────────────────────────────────────────────────────────

async fn build_monitor(cli: &Cli, config: &Config) -> anyhow::Result<AlertMonitor> {
    let state_path = config.storage.state_path();
    let store = Arc::new(
        JsonFileAlertStore::open(&state_path)
            .await
            .with_context(|| format!("opening {}", state_path.display()))?,
    );

    let snapshots: Arc<dyn SnapshotProvider> = match (&cli.snapshots, &config.sensor.service_url) {
        (Some(path), _) => {
            info!(path = %path.display(), "using static snapshots");
            Arc::new(StaticSnapshotProvider::from_file(path)?)
        }
        (None, Some(url)) => Arc::new(HttpSnapshotProvider::new(url, config.sensor.timeout)?),
        (None, None) => bail!("set SENSOR_SERVICE_URL or pass --snapshots <file>"),
    };

    let notifier = notifier_from_config(&config.notify, config.monitor.notify_timeout)?;
    let templates = MessageTemplates::new(
        config.notify.subject_template.clone(),
        config.notify.body_template.clone(),
    )?;

    Ok(AlertMonitor::new(
        store.clone(),
        store,
        snapshots,
        notifier,
        config.monitor.clone(),
    )
    .with_templates(templates))
}

fn check(conditions: &str, snapshot: &str) -> anyhow::Result<()> {
    let parsed = parse_conditions(conditions).context("parsing --conditions")?;
    let snapshot: Snapshot = serde_json::from_str(snapshot).context("parsing --snapshot")?;
    let evaluation = evaluate_detailed(&parsed.conditions, &snapshot);

    let output = serde_json::json!({
        "conditions": parsed.conditions,
        "rejected": parsed.rejected,
        "evaluation": evaluation,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    config::load_dotenv();
    let cli = Cli::parse();

    if let Command::Check {
        conditions,
        snapshot,
    } = &cli.command
    {
        return check(conditions, snapshot);
    }

    let mut config = Config::from_env();
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Command::Run {
        interval,
        cron,
        workers,
    } = &cli.command
    {
        if let Some(raw) = interval {
            config.monitor.tick_interval =
                parse_duration(raw).with_context(|| format!("invalid --interval '{raw}'"))?;
        }
        if cron.is_some() {
            config.monitor.tick_cron = cron.clone();
        }
        if let Some(n) = workers {
            config.monitor.workers = *n;
        }
    }
    config.validate()?;
    config.log_summary();

    let monitor = build_monitor(&cli, &config).await?;

    match cli.command {
        Command::Once => {
            let report = match monitor.run_once().await? {
                TickOutcome::Completed(report) => report,
                TickOutcome::Skipped => bail!("a tick is already running"),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Run { .. } => {
            let runner = MonitorRunner::new(Arc::new(monitor))?;
            let (tx, rx) = shutdown_channel();
            tokio::spawn(async move {
                hivewatch_monitor::runner::os_signal().await;
                info!("shutdown signal received");
                let _ = tx.send(true);
            });
            runner.run(rx).await;
            info!("alert-monitor exited cleanly");
        }
        Command::Check { .. } => {}
    }

    Ok(())
}
