pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;

pub use config::AppConfig;
pub use domain::{Field, Payload, Readiness, Slot, Snapshot, SnapshotView};
pub use error::{HashBotError, Result};
pub use services::{CycleReport, Dispatcher, Refresher, RefresherHandle};
