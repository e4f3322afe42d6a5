//! Timer-driven monitor loop with graceful shutdown.
//!
//! Ticks start on the configured [`Cadence`]. A tick that would start while
//! the previous one is still running is skipped, never queued. On shutdown
//! no new tick starts; an in-flight tick gets `shutdown_grace` to finish.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{error, info, warn};

use hivewatch_rules::scheduler::Cadence;

use crate::error::MonitorError;
use crate::monitor::{AlertMonitor, TickOutcome};

/// Create the shutdown signal pair. Send `true` (or drop the sender) to stop.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

enum Ticker {
    Interval(Interval),
    Cron(Cadence),
}

impl Ticker {
    fn new(cadence: Cadence) -> Self {
        match cadence {
            Cadence::Every(period) => {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Ticker::Interval(interval)
            }
            cron => Ticker::Cron(cron),
        }
    }

    /// Wait for the next tick. Returns `false` when the schedule has no
    /// further fire times.
    async fn next(&mut self) -> bool {
        match self {
            Ticker::Interval(interval) => {
                interval.tick().await;
                true
            }
            Ticker::Cron(cadence) => match cadence.delay_after(Utc::now()) {
                Some(delay) => {
                    tokio::time::sleep(delay).await;
                    true
                }
                None => false,
            },
        }
    }
}

pub struct MonitorRunner {
    monitor: Arc<AlertMonitor>,
    cadence: Cadence,
    shutdown_grace: Duration,
}

impl MonitorRunner {
    /// Runner using the cadence and grace period from the monitor's config.
    pub fn new(monitor: Arc<AlertMonitor>) -> Result<Self, MonitorError> {
        let cadence = Cadence::from_config(monitor.config())?;
        let shutdown_grace = monitor.config().shutdown_grace;
        Ok(Self {
            monitor,
            cadence,
            shutdown_grace,
        })
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }

    /// Run ticks until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(cadence = %self.cadence.describe(), "alert monitor started");
        let mut ticker = Ticker::new(self.cadence.clone());

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                more = ticker.next() => {
                    if !more {
                        info!("schedule has no further fire times");
                        break;
                    }
                }
                _ = shutdown.changed() => break,
            }

            let tick = self.monitor.run_once();
            tokio::pin!(tick);

            tokio::select! {
                result = &mut tick => log_tick(result),
                _ = shutdown.changed() => {
                    info!(grace = ?self.shutdown_grace, "shutdown requested, waiting for in-flight tick");
                    match tokio::time::timeout(self.shutdown_grace, &mut tick).await {
                        Ok(result) => log_tick(result),
                        Err(_) => warn!("in-flight tick abandoned after grace period"),
                    }
                    break;
                }
            }
        }

        info!("alert monitor stopped");
    }
}

fn log_tick(result: Result<TickOutcome, MonitorError>) {
    match result {
        Ok(TickOutcome::Completed(_)) | Ok(TickOutcome::Skipped) => {}
        Err(e) => error!(error = %e, "tick failed"),
    }
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C (cross-platform fallback).
pub async fn os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "failed to register signal handlers, using ctrl_c");
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl_c");
        std::future::pending::<()>().await;
    }
}
