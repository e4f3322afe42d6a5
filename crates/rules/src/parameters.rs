//! Sensor parameter names and their accepted aliases.
//!
//! The parameter set is open: providers may report metrics this table does
//! not know about, and those are matched by exact name only.

use hivewatch_core::Snapshot;

/// Canonical names of the metrics the hive sensors report.
pub const KNOWN_PARAMETERS: &[&str] = &[
    "temperature",
    "externalTemperature",
    "humidity",
    "co2",
    "soundLevel",
    "weight",
];

/// Map a user-facing parameter name to its canonical form.
///
/// Matching is case-insensitive and accepts the labels the dashboard shows
/// (`"Int. Temperature"`, `"ext temperature"`, `"sound"`). Unknown names are
/// returned unchanged.
pub fn canonical_parameter(name: &str) -> &str {
    let trimmed = name.trim();
    match trimmed.to_lowercase().as_str() {
        "temperature" | "int. temperature" | "int temperature" => "temperature",
        "externaltemperature" | "ext. temperature" | "ext temperature" => "externalTemperature",
        "humidity" => "humidity",
        "co2" => "co2",
        "sound" | "soundlevel" => "soundLevel",
        "weight" => "weight",
        _ => trimmed,
    }
}

/// Look up a parameter in a snapshot, trying the exact key first, then the
/// canonical name, then a case-insensitive match on the snapshot's keys.
pub fn lookup(snapshot: &Snapshot, parameter: &str) -> Option<f64> {
    if let Some(v) = snapshot.get(parameter) {
        return Some(v);
    }
    let canonical = canonical_parameter(parameter);
    if let Some(v) = snapshot.get(canonical) {
        return Some(v);
    }
    snapshot
        .iter()
        .find(|(key, _)| canonical_parameter(key).eq_ignore_ascii_case(canonical))
        .map(|(_, v)| v)
}
