//! Condition payloads in the shapes the dashboard has written over time,
//! parsed and evaluated end to end.

use hivewatch_core::Snapshot;
use hivewatch_rules::parameters::canonical_parameter;
use hivewatch_rules::{evaluate, evaluate_detailed, parse_conditions, Operator};

fn hive_reading() -> Snapshot {
    Snapshot::new()
        .with("temperature", 34.2)
        .with("externalTemperature", 18.0)
        .with("humidity", 62.0)
        .with("co2", 1450.0)
        .with("soundLevel", 71.0)
        .with("weight", 42.5)
}

#[test]
fn dashboard_payload_with_value_numbers() {
    let raw = r#"[
        {"parameter": "temperature", "operator": ">", "value": 33},
        {"parameter": "co2", "operator": ">=", "value": 1450}
    ]"#;
    let parsed = parse_conditions(raw).unwrap();
    assert_eq!(parsed.conditions.len(), 2);
    assert!(evaluate(&parsed.conditions, &hive_reading()));
}

#[test]
fn dashboard_payload_with_labels_and_string_values() {
    let raw = r#"[
        {"parameter": "Int. Temperature", "operator": "<", "value": "35"},
        {"parameter": "Ext. Temperature", "operator": "<=", "value": "18"},
        {"parameter": "Sound", "operator": "!=", "value": "0"}
    ]"#;
    let parsed = parse_conditions(raw).unwrap();
    assert!(parsed.rejected.is_empty());
    assert!(evaluate(&parsed.conditions, &hive_reading()));
}

#[test]
fn every_known_parameter_is_reachable() {
    let snapshot = hive_reading();
    for name in hivewatch_rules::parameters::KNOWN_PARAMETERS {
        let raw = format!(r#"[{{"parameter":"{name}","operator":">","threshold":-1000}}]"#);
        let parsed = parse_conditions(&raw).unwrap();
        assert!(evaluate(&parsed.conditions, &snapshot), "{name}");
        assert_eq!(canonical_parameter(name), *name);
    }
}

#[test]
fn partially_broken_payload_keeps_good_entries() {
    let raw = r#"[
        {"parameter": "weight", "operator": "<", "value": 50},
        {"parameter": "weight", "operator": "=<", "value": 50},
        {"parameter": "humidity", "operator": ">"}
    ]"#;
    let parsed = parse_conditions(raw).unwrap();
    assert_eq!(parsed.conditions.len(), 1);
    assert_eq!(parsed.conditions[0].operator, Operator::Lt);
    assert_eq!(
        parsed.rejected.iter().map(|r| r.index).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert!(evaluate(&parsed.conditions, &hive_reading()));
}

#[test]
fn unknown_sensor_is_incomplete_not_an_error() {
    let raw = r#"[{"parameter": "varroaCount", "operator": ">", "value": 3}]"#;
    let parsed = parse_conditions(raw).unwrap();
    let eval = evaluate_detailed(&parsed.conditions, &hive_reading());
    assert!(!eval.triggered);
    assert!(eval.incomplete);
    assert_eq!(eval.missing, vec!["varroaCount".to_string()]);
}
