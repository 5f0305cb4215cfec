//! api-football (v3) client for the Bayesball data sync.
//!
//! [`ApiFootballClient`] implements [`bayesball_core::source::SportsSource`].
//! All calls go through a [`Throttle`] that spaces requests by a fixed delay
//! and refuses calls beyond a per-run cap, which is the only backpressure
//! applied against the upstream rate limit.

mod client;
mod throttle;
mod wire;

pub mod error;

pub use client::{ApiFootballClient, SourceConfig};
pub use error::{Error, Result};
pub use throttle::Throttle;
