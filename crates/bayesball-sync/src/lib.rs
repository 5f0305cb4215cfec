//! The Bayesball sync jobs.
//!
//! Each job is an async function of its backends, its configuration and the
//! current time. Nothing here holds state between invocations: everything a
//! run needs is read from the [`SeasonStore`](bayesball_core::store::SeasonStore)
//! and every decision it makes is written back to it.
//!
//! - [`run_discovery`]: catalog → league and season records.
//! - [`run_scheduler`]: picks the stalest active seasons and syncs them.
//! - [`sync_season`]: one season's rosters and fixtures → blobs + freshness.

mod discovery;
mod fixture_sync;
mod scheduler;

pub mod config;
pub mod error;

pub use config::{DEFAULT_RUN_TIMEOUT, DiscoveryConfig, FixtureSyncConfig, SchedulerConfig};
pub use discovery::{DiscoveryReport, run_discovery};
pub use error::{Error, Result};
pub use fixture_sync::{SeasonSyncOutcome, sync_season};
pub use scheduler::{SchedulerReport, StopReason, run_scheduler};

#[cfg(test)]
mod tests;
