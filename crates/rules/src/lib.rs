//! Threshold alert rules for hive sensor readings.
//!
//! This crate provides:
//! - The condition model and the parser for stored condition payloads
//! - Parameter name aliases used by the dashboard
//! - The pure AND-evaluator over a hive snapshot
//! - Tick cadence helpers (fixed interval or cron)

pub mod evaluator;
pub mod parameters;
pub mod scheduler;
pub mod schema;

pub use evaluator::{evaluate, evaluate_detailed, Evaluation};
pub use schema::{parse_conditions, Condition, ConditionError, Operator, ParsedConditions};
