//! Condition schema for alert rules.
//!
//! Alerts store their trigger conditions as a JSON list of
//! `{parameter, operator, threshold}` objects. This module turns that text
//! into typed [`Condition`] values, dropping malformed entries one by one.

mod condition;

pub use condition::*;

#[cfg(test)]
mod tests;
