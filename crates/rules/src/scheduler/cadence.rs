//! [`Cadence`] — when the monitor loop should tick next.

use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;

use hivewatch_core::config::MonitorConfig;

use super::cron::{normalize_cron, parse_cron};

#[derive(Debug, thiserror::Error)]
pub enum CadenceError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("tick interval must be greater than zero")]
    ZeroInterval,
}

/// Tick schedule of the monitor loop.
#[derive(Debug, Clone)]
pub enum Cadence {
    /// Fixed interval between tick starts.
    Every(Duration),
    /// Ticks at each fire time of a cron schedule (UTC).
    Cron {
        expression: String,
        schedule: Box<Schedule>,
    },
}

impl Cadence {
    pub fn every(interval: Duration) -> Result<Self, CadenceError> {
        if interval.is_zero() {
            return Err(CadenceError::ZeroInterval);
        }
        Ok(Cadence::Every(interval))
    }

    pub fn cron(expr: &str) -> Result<Self, CadenceError> {
        let schedule = parse_cron(expr).map_err(|e| CadenceError::InvalidCron {
            expr: expr.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Cadence::Cron {
            expression: normalize_cron(expr),
            schedule: Box::new(schedule),
        })
    }

    /// A cron expression in the config takes precedence over the interval.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, CadenceError> {
        match &config.tick_cron {
            Some(expr) => Self::cron(expr),
            None => Self::every(config.tick_interval),
        }
    }

    /// Time from `now` until the next tick should start.
    ///
    /// For a cron schedule with no upcoming fire time this returns `None`,
    /// and the loop has nothing left to run.
    pub fn delay_after(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            Cadence::Every(interval) => Some(*interval),
            Cadence::Cron { schedule, .. } => {
                let next = schedule.after(&now).next()?;
                Some(
                    next.signed_duration_since(now)
                        .to_std()
                        .unwrap_or(Duration::ZERO),
                )
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Cadence::Every(interval) => format!("every {}s", interval.as_secs()),
            Cadence::Cron { expression, .. } => format!("cron '{}'", expression),
        }
    }
}
