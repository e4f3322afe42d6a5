//! Threshold conditions and the parser for their stored JSON form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use tracing::debug;

/// Numeric comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Eq => "==",
            Operator::Neq => "!=",
        }
    }

    /// Compare a reading against a threshold.
    ///
    /// `Eq`/`Neq` are exact IEEE-754 comparisons: a reading of `30.000001`
    /// does not equal a threshold of `30`. NaN is unequal to everything.
    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Gt => value > threshold,
            Operator::Lt => value < threshold,
            Operator::Gte => value >= threshold,
            Operator::Lte => value <= threshold,
            Operator::Eq => value == threshold,
            Operator::Neq => value != threshold,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Gte),
            "<=" => Ok(Operator::Lte),
            "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Neq),
            other => Err(format!("unknown operator: '{}'", other)),
        }
    }
}

/// A single `parameter operator threshold` clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub parameter: String,
    pub operator: Operator,
    pub threshold: f64,
}

impl Condition {
    pub fn new(parameter: impl Into<String>, operator: Operator, threshold: f64) -> Self {
        Self {
            parameter: parameter.into(),
            operator,
            threshold,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.parameter, self.operator, self.threshold)
    }
}

/// Errors that reject a condition payload as a whole.
#[derive(Debug, thiserror::Error)]
pub enum ConditionError {
    #[error("condition payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("condition payload must be a JSON list, got {0}")]
    NotAList(&'static str),
}

/// A payload entry that was dropped during parsing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedCondition {
    /// Position of the entry in the stored list.
    pub index: usize,
    pub reason: String,
}

/// Outcome of parsing a condition payload: the usable clauses, in stored
/// order, plus the entries that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedConditions {
    pub conditions: Vec<Condition>,
    pub rejected: Vec<RejectedCondition>,
}

impl ParsedConditions {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Raw entry shape. The UI historically stored the threshold as `value`,
/// often as a string straight from a number input.
#[derive(Debug, Deserialize)]
struct RawCondition {
    parameter: Option<serde_json::Value>,
    operator: Option<serde_json::Value>,
    threshold: Option<serde_json::Value>,
    value: Option<serde_json::Value>,
}

/// Parse a stored condition payload.
///
/// A blank payload yields no conditions. Entries that are malformed are
/// dropped individually and reported in [`ParsedConditions::rejected`]; the
/// rest are kept. Only a payload that is not a JSON list fails outright.
pub fn parse_conditions(raw: &str) -> Result<ParsedConditions, ConditionError> {
    if raw.trim().is_empty() {
        return Ok(ParsedConditions::default());
    }

    let value: serde_json::Value = serde_json::from_str(raw)?;
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        serde_json::Value::Null => return Ok(ParsedConditions::default()),
        serde_json::Value::Object(_) => return Err(ConditionError::NotAList("an object")),
        serde_json::Value::String(_) => return Err(ConditionError::NotAList("a string")),
        serde_json::Value::Number(_) => return Err(ConditionError::NotAList("a number")),
        serde_json::Value::Bool(_) => return Err(ConditionError::NotAList("a boolean")),
    };

    let mut parsed = ParsedConditions::default();
    for (index, entry) in entries.into_iter().enumerate() {
        match parse_entry(entry) {
            Ok(condition) => parsed.conditions.push(condition),
            Err(reason) => {
                debug!(index, reason = %reason, "dropping malformed condition entry");
                parsed.rejected.push(RejectedCondition { index, reason });
            }
        }
    }

    Ok(parsed)
}

fn parse_entry(entry: serde_json::Value) -> Result<Condition, String> {
    if !entry.is_object() {
        return Err("entry is not an object".to_string());
    }
    let raw: RawCondition =
        serde_json::from_value(entry).map_err(|e| format!("unreadable entry: {e}"))?;

    let parameter = match raw.parameter {
        Some(serde_json::Value::String(p)) if !p.trim().is_empty() => p.trim().to_string(),
        Some(serde_json::Value::String(_)) => return Err("empty `parameter`".to_string()),
        Some(_) => return Err("`parameter` must be a string".to_string()),
        None => return Err("missing `parameter`".to_string()),
    };

    let operator = match raw.operator {
        Some(serde_json::Value::String(op)) => op.parse::<Operator>()?,
        Some(_) => return Err("`operator` must be a string".to_string()),
        None => return Err("missing `operator`".to_string()),
    };

    let threshold = match (raw.threshold, raw.value) {
        (Some(t), _) => numeric(&t, "threshold")?,
        (None, Some(v)) => numeric(&v, "value")?,
        (None, None) => return Err("missing `threshold`".to_string()),
    };

    Ok(Condition {
        parameter,
        operator,
        threshold,
    })
}

fn numeric(value: &serde_json::Value, field: &str) -> Result<f64, String> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(format!("`{field}` is not a finite number: {value}")),
    }
}
