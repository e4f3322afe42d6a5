//! Threshold rule evaluator.
//!
//! An alert is triggered iff every one of its conditions holds against the
//! hive's current snapshot. The evaluator is a pure function of its inputs.
//!
//! Policies:
//! - an empty condition list never triggers;
//! - a parameter missing from the snapshot makes its condition false and
//!   marks the evaluation as incomplete;
//! - `==` and `!=` compare readings exactly, see [`Operator::compare`].
//!
//! [`Operator::compare`]: crate::schema::Operator::compare

use serde::Serialize;

use hivewatch_core::Snapshot;

use crate::parameters::lookup;
use crate::schema::Condition;

/// Detailed result of evaluating one condition set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub triggered: bool,
    /// True when at least one referenced parameter had no reading.
    pub incomplete: bool,
    /// Parameters referenced by conditions but absent from the snapshot.
    pub missing: Vec<String>,
    /// Index of the first condition that did not hold.
    pub failed_at: Option<usize>,
}

/// Evaluate conditions against a snapshot. `true` iff all conditions hold.
pub fn evaluate(conditions: &[Condition], snapshot: &Snapshot) -> bool {
    evaluate_detailed(conditions, snapshot).triggered
}

/// Evaluate conditions and report why the result came out the way it did.
///
/// The boolean result short-circuits on the first failing condition, but
/// every condition is still checked for a missing parameter so the
/// diagnostic lists all of them.
pub fn evaluate_detailed(conditions: &[Condition], snapshot: &Snapshot) -> Evaluation {
    if conditions.is_empty() {
        return Evaluation::default();
    }

    let mut eval = Evaluation {
        triggered: true,
        ..Evaluation::default()
    };

    for (idx, condition) in conditions.iter().enumerate() {
        let holds = match lookup(snapshot, &condition.parameter) {
            Some(value) => condition.operator.compare(value, condition.threshold),
            None => {
                eval.incomplete = true;
                eval.missing.push(condition.parameter.clone());
                false
            }
        };

        if !holds && eval.triggered {
            eval.triggered = false;
            eval.failed_at = Some(idx);
        }
    }

    eval
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{parse_conditions, Operator};

    fn cond(p: &str, op: Operator, t: f64) -> Condition {
        Condition::new(p, op, t)
    }

    #[test]
    fn single_condition_above_threshold_triggers() {
        let snap = Snapshot::new().with("temperature", 35.0);
        assert!(evaluate(&[cond("temperature", Operator::Gt, 30.0)], &snap));
    }

    #[test]
    fn second_condition_failing_blocks_trigger() {
        let snap = Snapshot::new()
            .with("temperature", 35.0)
            .with("humidity", 55.0);
        let conditions = [
            cond("temperature", Operator::Gt, 30.0),
            cond("humidity", Operator::Lt, 50.0),
        ];
        let eval = evaluate_detailed(&conditions, &snap);
        assert!(!eval.triggered);
        assert_eq!(eval.failed_at, Some(1));
        assert!(!eval.incomplete);
    }

    #[test]
    fn missing_parameter_never_triggers() {
        let snap = Snapshot::new();
        let eval = evaluate_detailed(&[cond("co2", Operator::Gt, 1000.0)], &snap);
        assert!(!eval.triggered);
        assert!(eval.incomplete);
        assert_eq!(eval.missing, vec!["co2".to_string()]);
    }

    #[test]
    fn missing_parameter_fails_even_with_permissive_operator() {
        // `!=` would hold for any present reading; absence must still be false.
        let snap = Snapshot::new().with("temperature", 20.0);
        assert!(!evaluate(&[cond("weight", Operator::Neq, 0.0)], &snap));
    }

    #[test]
    fn empty_conditions_never_trigger() {
        let snap = Snapshot::new().with("temperature", 100.0);
        assert!(!evaluate(&[], &snap));
        assert!(!evaluate(&[], &Snapshot::new()));
    }

    #[test]
    fn and_semantics_match_individual_results() {
        let snaps = [
            Snapshot::new().with("temperature", 35.0).with("humidity", 40.0),
            Snapshot::new().with("temperature", 35.0).with("humidity", 60.0),
            Snapshot::new().with("temperature", 25.0).with("humidity", 40.0),
            Snapshot::new().with("temperature", 25.0),
        ];
        let c1 = cond("temperature", Operator::Gt, 30.0);
        let c2 = cond("humidity", Operator::Lt, 50.0);

        for snap in &snaps {
            let both = evaluate(&[c1.clone(), c2.clone()], snap);
            let each = evaluate(&[c1.clone()], snap) && evaluate(&[c2.clone()], snap);
            assert_eq!(both, each, "snapshot {:?}", snap);
        }
    }

    #[test]
    fn evaluation_is_repeatable() {
        let snap = Snapshot::new().with("weight", 7.5);
        let conditions = [cond("weight", Operator::Lte, 8.0)];
        let first = evaluate_detailed(&conditions, &snap);
        for _ in 0..10 {
            assert_eq!(evaluate_detailed(&conditions, &snap), first);
        }
    }

    #[test]
    fn boundary_operators() {
        let snap = Snapshot::new().with("humidity", 50.0);
        assert!(!evaluate(&[cond("humidity", Operator::Gt, 50.0)], &snap));
        assert!(evaluate(&[cond("humidity", Operator::Gte, 50.0)], &snap));
        assert!(!evaluate(&[cond("humidity", Operator::Lt, 50.0)], &snap));
        assert!(evaluate(&[cond("humidity", Operator::Lte, 50.0)], &snap));
    }

    #[test]
    fn equality_is_exact() {
        let snap = Snapshot::new().with("co2", 0.1 + 0.2);
        assert!(!evaluate(&[cond("co2", Operator::Eq, 0.3)], &snap));
        assert!(evaluate(&[cond("co2", Operator::Neq, 0.3)], &snap));

        let snap = Snapshot::new().with("co2", 800.0);
        assert!(evaluate(&[cond("co2", Operator::Eq, 800.0)], &snap));
    }

    #[test]
    fn nan_reading_only_satisfies_not_equal() {
        let snap = Snapshot::new().with("weight", f64::NAN);
        for op in [Operator::Gt, Operator::Lt, Operator::Gte, Operator::Lte, Operator::Eq] {
            assert!(!evaluate(&[cond("weight", op, 5.0)], &snap), "{op}");
        }
        assert!(evaluate(&[cond("weight", Operator::Neq, 5.0)], &snap));
    }

    #[test]
    fn all_missing_parameters_are_reported() {
        let snap = Snapshot::new().with("temperature", 10.0);
        let conditions = [
            cond("temperature", Operator::Gt, 30.0),
            cond("co2", Operator::Gt, 1000.0),
            cond("weight", Operator::Lt, 3.0),
        ];
        let eval = evaluate_detailed(&conditions, &snap);
        assert_eq!(eval.failed_at, Some(0));
        assert_eq!(eval.missing, vec!["co2".to_string(), "weight".to_string()]);
    }

    #[test]
    fn aliases_are_resolved_during_evaluation() {
        let snap = Snapshot::new().with("soundLevel", 90.0);
        let parsed =
            parse_conditions(r#"[{"parameter":"sound","operator":">","value":"85"}]"#).unwrap();
        assert!(evaluate(&parsed.conditions, &snap));
    }
}
