//! Alert monitoring loop for hive sensor rules.
//!
//! This crate provides:
//! - `AlertStore` and `OwnerDirectory` traits with in-memory and JSON-file backends
//! - `SnapshotProvider` trait with an HTTP sensor-service client and a static provider
//! - `AlertMonitor`, which runs one evaluation pass over all alerts
//! - `MonitorRunner`, which drives ticks on a cadence until shutdown

pub mod error;
pub mod file_store;
pub mod monitor;
pub mod owners;
pub mod runner;
pub mod snapshot;
pub mod store;

pub use error::MonitorError;
pub use file_store::JsonFileAlertStore;
pub use monitor::{AlertMonitor, TickOutcome, TickReport};
pub use owners::{MemoryOwnerDirectory, OwnerDirectory};
pub use runner::{shutdown_channel, MonitorRunner};
pub use snapshot::{HttpSnapshotProvider, SnapshotError, SnapshotProvider, StaticSnapshotProvider};
pub use store::{AlertStore, MemoryAlertStore, StoreError};
