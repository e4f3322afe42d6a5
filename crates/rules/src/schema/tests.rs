//! Tests for condition parsing.

use super::*;

const HOT_AND_DRY: &str = r#"[
    {"parameter": "temperature", "operator": ">", "threshold": 30},
    {"parameter": "humidity", "operator": "<", "threshold": 50}
]"#;

#[test]
fn parse_threshold_conditions_in_order() {
    let parsed = parse_conditions(HOT_AND_DRY).unwrap();
    assert!(parsed.rejected.is_empty());
    assert_eq!(
        parsed.conditions,
        vec![
            Condition::new("temperature", Operator::Gt, 30.0),
            Condition::new("humidity", Operator::Lt, 50.0),
        ]
    );
}

#[test]
fn parse_legacy_value_field_as_string() {
    let parsed =
        parse_conditions(r#"[{"parameter":"co2","operator":">=","value":"1200.5"}]"#).unwrap();
    assert_eq!(parsed.conditions, vec![Condition::new("co2", Operator::Gte, 1200.5)]);
}

#[test]
fn threshold_wins_over_value() {
    let parsed = parse_conditions(
        r#"[{"parameter":"weight","operator":"<=","threshold":4,"value":9}]"#,
    )
    .unwrap();
    assert_eq!(parsed.conditions[0].threshold, 4.0);
}

#[test]
fn all_operators_parse() {
    for (sym, op) in [
        (">", Operator::Gt),
        ("<", Operator::Lt),
        (">=", Operator::Gte),
        ("<=", Operator::Lte),
        ("==", Operator::Eq),
        ("!=", Operator::Neq),
    ] {
        assert_eq!(sym.parse::<Operator>().unwrap(), op);
        assert_eq!(op.to_string(), sym);
    }
}

#[test]
fn malformed_entries_are_dropped_individually() {
    let raw = r#"[
        {"parameter": "temperature", "operator": ">", "threshold": 30},
        {"parameter": "humidity", "operator": "~=", "threshold": 50},
        {"operator": "<", "threshold": 10},
        {"parameter": "weight", "operator": "<"},
        {"parameter": "co2", "operator": ">", "threshold": "lots"},
        "soundLevel > 80",
        {"parameter": "soundLevel", "operator": ">", "value": 80}
    ]"#;
    let parsed = parse_conditions(raw).unwrap();

    assert_eq!(
        parsed.conditions,
        vec![
            Condition::new("temperature", Operator::Gt, 30.0),
            Condition::new("soundLevel", Operator::Gt, 80.0),
        ]
    );
    let rejected: Vec<usize> = parsed.rejected.iter().map(|r| r.index).collect();
    assert_eq!(rejected, vec![1, 2, 3, 4, 5]);
    assert!(parsed.rejected[0].reason.contains("unknown operator"));
    assert!(parsed.rejected[1].reason.contains("missing `parameter`"));
    assert!(parsed.rejected[2].reason.contains("missing `threshold`"));
}

#[test]
fn extra_keys_are_ignored() {
    let parsed = parse_conditions(
        r#"[{"id": 3, "parameter":"temperature","operator":">","threshold":30,"unit":"C"}]"#,
    )
    .unwrap();
    assert_eq!(parsed.conditions.len(), 1);
    assert!(parsed.rejected.is_empty());
}

#[test]
fn blank_or_null_payload_has_no_conditions() {
    assert!(parse_conditions("").unwrap().is_empty());
    assert!(parse_conditions("   ").unwrap().is_empty());
    assert!(parse_conditions("null").unwrap().is_empty());
    assert!(parse_conditions("[]").unwrap().is_empty());
}

#[test]
fn non_list_payload_is_an_error() {
    let err = parse_conditions(r#"{"parameter":"temperature"}"#).unwrap_err();
    assert!(matches!(err, ConditionError::NotAList("an object")));

    let err = parse_conditions("[{").unwrap_err();
    assert!(matches!(err, ConditionError::Json(_)));
}

#[test]
fn non_finite_threshold_is_rejected() {
    let parsed =
        parse_conditions(r#"[{"parameter":"co2","operator":">","threshold":"NaN"}]"#).unwrap();
    assert!(parsed.conditions.is_empty());
    assert_eq!(parsed.rejected.len(), 1);
}

#[test]
fn condition_display() {
    let c = Condition::new("temperature", Operator::Gte, 30.5);
    assert_eq!(c.to_string(), "temperature >= 30.5");
}
