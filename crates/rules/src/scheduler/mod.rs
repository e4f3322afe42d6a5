//! Monitor cadence: a fixed interval or a cron schedule.
//!
//! The monitor loop owns its timer; this module only answers "how long until
//! the next tick". It has no knowledge of alerts.

mod cadence;
pub(crate) mod cron;


pub use self::cadence::{Cadence, CadenceError};
pub use self::cron::normalize_cron;
pub use hivewatch_core::config::parse_duration;
