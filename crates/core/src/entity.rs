use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque alert identifier (numeric ids from the legacy store arrive as strings).
pub type AlertId = String;
pub type HiveId = String;
pub type UserId = String;

/// A stored threshold rule watching one hive.
///
/// `conditions` is kept in its stored textual form; the rules crate parses it
/// at evaluation time. `is_triggered` is written only by the monitor loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: AlertId,
    pub hive_id: HiveId,
    pub name: String,
    #[serde(default)]
    pub conditions: String,
    #[serde(default)]
    pub is_triggered: bool,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Build a new, untriggered alert stamped with the current time.
    pub fn new(
        id: impl Into<AlertId>,
        hive_id: impl Into<HiveId>,
        name: impl Into<String>,
        conditions: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            hive_id: hive_id.into(),
            name: name.into(),
            conditions: conditions.into(),
            is_triggered: false,
            created_at: Utc::now(),
        }
    }

    pub fn trigger_state(&self) -> TriggerState {
        TriggerState::from(self.is_triggered)
    }
}

/// The two states of an alert. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerState {
    NotTriggered,
    Triggered,
}

impl From<bool> for TriggerState {
    fn from(triggered: bool) -> Self {
        if triggered {
            TriggerState::Triggered
        } else {
            TriggerState::NotTriggered
        }
    }
}

impl std::fmt::Display for TriggerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerState::NotTriggered => write!(f, "NOT_TRIGGERED"),
            TriggerState::Triggered => write!(f, "TRIGGERED"),
        }
    }
}

/// The user owning a hive, as far as the monitor needs to know.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub user_id: UserId,
    pub email: String,
    /// Opt-in flag for alert emails. Off unless the user enabled it.
    #[serde(default)]
    pub notifications_enabled: bool,
}

/// Point-in-time sensor readings for one hive, keyed by parameter name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Snapshot {
    pub values: HashMap<String, f64>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, parameter: impl Into<String>, value: f64) -> Self {
        self.values.insert(parameter.into(), value);
        self
    }

    /// Exact-key lookup. Alias resolution lives in the rules crate.
    pub fn get(&self, parameter: &str) -> Option<f64> {
        self.values.get(parameter).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Snapshots for all hives of one user, keyed by hive id.
pub type SnapshotBatch = HashMap<HiveId, Snapshot>;
