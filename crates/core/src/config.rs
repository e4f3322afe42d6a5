use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HiveError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str) -> Option<u16> {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok())
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

fn profiled_env_duration(profile: &str, key: &str, default: Duration) -> Duration {
    match profiled_env_opt(profile, key) {
        Some(raw) => parse_duration(&raw).unwrap_or_else(|| {
            tracing::warn!(key, value = %raw, "unparseable duration, using default");
            default
        }),
        None => default,
    }
}

/// Parse a human-readable duration string into a [`Duration`].
///
/// Supports components: `Xd` (days), `Xh` (hours), `Xm` (minutes), `Xs` (seconds).
/// Components can be combined: "2h30m", "1d12h", "90s".
/// A bare number is read as seconds. Returns `None` if empty, unparseable,
/// or too large to count in seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut total_secs: u64 = 0;
    let mut num_buf = String::new();
    let mut found_unit = false;

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            num_buf.push(ch);
        } else {
            let n: u64 = num_buf.parse().ok()?;
            num_buf.clear();
            let unit_secs = match ch {
                'd' => 86_400,
                'h' => 3_600,
                'm' => 60,
                's' => 1,
                _ => return None,
            };
            total_secs = total_secs.checked_add(n.checked_mul(unit_secs)?)?;
            found_unit = true;
        }
    }

    if !num_buf.is_empty() {
        if found_unit {
            // "30m15" is ambiguous.
            return None;
        }
        total_secs = total_secs.checked_add(num_buf.parse::<u64>().ok()?)?;
    }

    Some(Duration::from_secs(total_secs))
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub monitor: MonitorConfig,
    pub storage: StorageConfig,
    pub sensor: SensorConfig,
    pub notify: NotifyConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `HIVEWATCH_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("HIVEWATCH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            monitor: MonitorConfig::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
            sensor: SensorConfig::from_env_profiled(p),
            notify: NotifyConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject combinations the monitor cannot run with.
    pub fn validate(&self) -> Result<(), HiveError> {
        if self.monitor.workers == 0 {
            return Err(HiveError::Config("MONITOR_WORKERS must be at least 1".into()));
        }
        if self.monitor.tick_cron.is_none() && self.monitor.tick_interval.is_zero() {
            return Err(HiveError::Config("TICK_INTERVAL must be greater than zero".into()));
        }
        if self.monitor.tick_timeout.is_zero() {
            return Err(HiveError::Config("TICK_TIMEOUT must be greater than zero".into()));
        }
        if self.monitor.notify_timeout.is_zero() {
            return Err(HiveError::Config("NOTIFY_TIMEOUT must be greater than zero".into()));
        }
        match self.notify.transport {
            NotifyTransport::Http if self.notify.service_url.is_none() => Err(HiveError::Config(
                "NOTIFY_TRANSPORT=http requires NOTIFICATION_SERVICE_URL".into(),
            )),
            NotifyTransport::Email
                if self.notify.smtp_host.is_none() || self.notify.smtp_from.is_none() =>
            {
                Err(HiveError::Config(
                    "NOTIFY_TRANSPORT=email requires SMTP_HOST and SMTP_FROM".into(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        match &self.monitor.tick_cron {
            Some(cron) => tracing::info!("  monitor:  cron={}", cron),
            None => tracing::info!("  monitor:  interval={}s", self.monitor.tick_interval.as_secs()),
        }
        tracing::info!(
            "  monitor:  timeout={}s, workers={}, notify_timeout={}s",
            self.monitor.tick_timeout.as_secs(),
            self.monitor.workers,
            self.monitor.notify_timeout.as_secs()
        );
        tracing::info!("  storage:  data_dir={}", self.storage.data_dir.display());
        tracing::info!(
            "  sensor:   url={}",
            self.sensor.service_url.as_deref().unwrap_or("(none)")
        );
        tracing::info!(
            "  notify:   transport={}, url={}, smtp={}",
            self.notify.transport,
            self.notify.service_url.as_deref().unwrap_or("(none)"),
            self.notify.smtp_host.as_deref().unwrap_or("(none)")
        );
    }
}

// ── Monitor ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Fixed tick cadence. Ignored when `tick_cron` is set.
    pub tick_interval: Duration,
    /// Optional cron expression (5 or 6 fields) replacing the fixed interval.
    pub tick_cron: Option<String>,
    /// Upper bound for one full pass over all alerts.
    pub tick_timeout: Duration,
    /// Number of user groups evaluated concurrently within a tick.
    pub workers: usize,
    /// Upper bound for a single notifier call.
    pub notify_timeout: Duration,
    /// How long an in-flight tick may keep running after shutdown is requested.
    pub shutdown_grace: Duration,
}

impl MonitorConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            tick_interval: profiled_env_duration(p, "TICK_INTERVAL", Duration::from_secs(300)),
            tick_cron: profiled_env_opt(p, "TICK_CRON"),
            tick_timeout: profiled_env_duration(p, "TICK_TIMEOUT", Duration::from_secs(120)),
            workers: profiled_env_usize(p, "MONITOR_WORKERS", 4),
            notify_timeout: profiled_env_duration(p, "NOTIFY_TIMEOUT", Duration::from_secs(10)),
            shutdown_grace: profiled_env_duration(p, "SHUTDOWN_GRACE", Duration::from_secs(30)),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(300),
            tick_cron: None,
            tick_timeout: Duration::from_secs(120),
            workers: 4,
            notify_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
        }
    }

    /// JSON document holding users, hives and alerts.
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("hivewatch.json")
    }
}

// ── Sensor service ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub service_url: Option<String>,
    pub timeout: Duration,
}

impl SensorConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            service_url: profiled_env_opt(p, "SENSOR_SERVICE_URL"),
            timeout: profiled_env_duration(p, "SENSOR_TIMEOUT", Duration::from_secs(10)),
        }
    }
}

// ── Notification transport ────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyTransport {
    /// POST to the notification service.
    Http,
    /// Direct SMTP delivery.
    Email,
    /// Log the rendered message only.
    Log,
}

impl std::fmt::Display for NotifyTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyTransport::Http => write!(f, "http"),
            NotifyTransport::Email => write!(f, "email"),
            NotifyTransport::Log => write!(f, "log"),
        }
    }
}

impl std::str::FromStr for NotifyTransport {
    type Err = HiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(NotifyTransport::Http),
            "email" | "smtp" => Ok(NotifyTransport::Email),
            "log" => Ok(NotifyTransport::Log),
            other => Err(HiveError::Config(format!("unknown notify transport: '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub transport: NotifyTransport,
    pub service_url: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_tls: bool,
    pub smtp_from: Option<String>,
    /// minijinja override for the subject line.
    pub subject_template: Option<String>,
    /// minijinja override for the message body.
    pub body_template: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            transport: NotifyTransport::Http,
            service_url: None,
            smtp_host: None,
            smtp_port: None,
            smtp_tls: true,
            smtp_from: None,
            subject_template: None,
            body_template: None,
        }
    }
}

impl NotifyConfig {
    fn from_env_profiled(p: &str) -> Self {
        let transport = profiled_env_or(p, "NOTIFY_TRANSPORT", "http");
        let transport = transport.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to log transport");
            NotifyTransport::Log
        });
        Self {
            transport,
            service_url: profiled_env_opt(p, "NOTIFICATION_SERVICE_URL"),
            smtp_host: profiled_env_opt(p, "SMTP_HOST"),
            smtp_port: profiled_env_u16(p, "SMTP_PORT"),
            smtp_tls: profiled_env_bool(p, "SMTP_TLS", true),
            smtp_from: profiled_env_opt(p, "SMTP_FROM"),
            subject_template: profiled_env_opt(p, "NOTIFY_SUBJECT_TEMPLATE"),
            body_template: profiled_env_opt(p, "NOTIFY_BODY_TEMPLATE"),
        }
    }
}
