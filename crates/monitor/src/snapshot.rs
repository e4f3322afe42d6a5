//! Sensor Snapshot Provider: current readings for a user's hives.
//!
//! Snapshots are fetched fresh for every tick and never cached here.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hivewatch_core::{HiveId, Owner, Snapshot, SnapshotBatch};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("sensor service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sensor service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("snapshot source unreadable: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Readings for the given hives of `owner`. Hives without data are
    /// simply absent from the batch.
    async fn snapshots_for_user(
        &self,
        owner: &Owner,
        hive_ids: &[HiveId],
    ) -> Result<SnapshotBatch, SnapshotError>;
}

// ── HTTP ────────────────────────────────────────────────────────────

const REALTIME_PATH: &str = "/api/sensor-data/realtime";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeRequest<'a> {
    hive_ids: &'a [HiveId],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeResponse {
    #[serde(default)]
    sensor_data: HashMap<HiveId, serde_json::Map<String, serde_json::Value>>,
}

/// Client for the sensor service's realtime endpoint.
#[derive(Debug)]
pub struct HttpSnapshotProvider {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSnapshotProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SnapshotError> {
        let base = base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(SnapshotError::Config("sensor service URL is empty".into()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: format!("{base}{REALTIME_PATH}"),
            client,
        })
    }
}

#[async_trait]
impl SnapshotProvider for HttpSnapshotProvider {
    async fn snapshots_for_user(
        &self,
        owner: &Owner,
        hive_ids: &[HiveId],
    ) -> Result<SnapshotBatch, SnapshotError> {
        if hive_ids.is_empty() {
            return Ok(SnapshotBatch::new());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&RealtimeRequest { hive_ids })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SnapshotError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: RealtimeResponse = response.json().await?;
        let batch: SnapshotBatch = reply
            .sensor_data
            .into_iter()
            .map(|(hive_id, readings)| (hive_id, numeric_readings(readings)))
            .collect();

        tracing::debug!(
            user_id = %owner.user_id,
            requested = hive_ids.len(),
            received = batch.len(),
            "sensor snapshot fetched"
        );
        Ok(batch)
    }
}

/// Keep numeric readings; sensors report `null` for metrics they lack.
fn numeric_readings(readings: serde_json::Map<String, serde_json::Value>) -> Snapshot {
    readings
        .into_iter()
        .filter_map(|(param, value)| value.as_f64().map(|v| (param, v)))
        .collect()
}

// ── Static ──────────────────────────────────────────────────────────

/// Serves a fixed set of snapshots, for tests and offline runs.
#[derive(Debug, Default, Clone)]
pub struct StaticSnapshotProvider {
    snapshots: SnapshotBatch,
}

impl StaticSnapshotProvider {
    pub fn new(snapshots: SnapshotBatch) -> Self {
        Self { snapshots }
    }

    pub fn with_hive(mut self, hive_id: impl Into<HiveId>, snapshot: Snapshot) -> Self {
        self.snapshots.insert(hive_id.into(), snapshot);
        self
    }

    /// Load `{hiveId: {parameter: value}}` from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SnapshotError::Source(format!("{}: {e}", path.display())))?;
        let snapshots = serde_json::from_str(&text)
            .map_err(|e| SnapshotError::Source(format!("{}: {e}", path.display())))?;
        Ok(Self { snapshots })
    }
}

#[async_trait]
impl SnapshotProvider for StaticSnapshotProvider {
    async fn snapshots_for_user(
        &self,
        _owner: &Owner,
        hive_ids: &[HiveId],
    ) -> Result<SnapshotBatch, SnapshotError> {
        Ok(hive_ids
            .iter()
            .filter_map(|id| self.snapshots.get(id).map(|s| (id.clone(), s.clone())))
            .collect())
    }
}
