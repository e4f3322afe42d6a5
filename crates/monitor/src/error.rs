use std::time::Duration;

use thiserror::Error;

use hivewatch_rules::scheduler::CadenceError;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Schedule error: {0}")]
    Cadence(#[from] CadenceError),

    #[error("Tick exceeded its {0:?} budget")]
    TickTimeout(Duration),

    #[error("Commit task failed: {0}")]
    Task(String),
}
