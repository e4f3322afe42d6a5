//! Alert State Store: where alerts and their trigger flags live.
//!
//! The monitor loop is the only writer of `is_triggered`, and it writes
//! through [`AlertStore::update_trigger_state`], a compare-and-set on the
//! value read at the start of the tick.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use hivewatch_core::{Alert, AlertId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("alert not found: {0}")]
    NotFound(AlertId),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// All alerts, in a stable order.
    async fn list_all(&self) -> Result<Vec<Alert>, StoreError>;

    async fn get(&self, alert_id: &str) -> Result<Option<Alert>, StoreError>;

    /// Set `is_triggered` to `new_state` only if it still equals
    /// `expected_previous`. Returns whether the write applied.
    async fn update_trigger_state(
        &self,
        alert_id: &str,
        expected_previous: bool,
        new_state: bool,
    ) -> Result<bool, StoreError>;
}

/// In-memory store, keyed by alert id.
#[derive(Debug, Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<BTreeMap<AlertId, Alert>>,
}

impl MemoryAlertStore {
    pub fn new(alerts: impl IntoIterator<Item = Alert>) -> Self {
        Self {
            alerts: RwLock::new(alerts.into_iter().map(|a| (a.id.clone(), a)).collect()),
        }
    }

    /// Insert or replace an alert, as the CRUD layer would.
    pub async fn upsert(&self, alert: Alert) {
        self.alerts.write().await.insert(alert.id.clone(), alert);
    }

    pub async fn is_triggered(&self, alert_id: &str) -> Option<bool> {
        self.alerts.read().await.get(alert_id).map(|a| a.is_triggered)
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn list_all(&self) -> Result<Vec<Alert>, StoreError> {
        Ok(self.alerts.read().await.values().cloned().collect())
    }

    async fn get(&self, alert_id: &str) -> Result<Option<Alert>, StoreError> {
        Ok(self.alerts.read().await.get(alert_id).cloned())
    }

    async fn update_trigger_state(
        &self,
        alert_id: &str,
        expected_previous: bool,
        new_state: bool,
    ) -> Result<bool, StoreError> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(alert_id)
            .ok_or_else(|| StoreError::NotFound(alert_id.to_string()))?;
        if alert.is_triggered != expected_previous {
            return Ok(false);
        }
        alert.is_triggered = new_state;
        Ok(true)
    }
}
