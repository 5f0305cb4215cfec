//! Tunables of the sync jobs.

use std::time::Duration;

use chrono::TimeDelta;

/// Default wall-clock budget of a scheduler run, a minute short of a
/// 15-minute invocation limit.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(14 * 60);

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
  /// Seasons up to and including this year are ignored.
  pub first_season_year:     i32,
  /// Update the static fields of seasons that already exist. When off,
  /// existing seasons are left alone entirely.
  pub merge_static_metadata: bool,
}

impl Default for DiscoveryConfig {
  fn default() -> Self { Self { first_season_year: 2019, merge_static_metadata: true } }
}

#[derive(Debug, Clone)]
pub struct FixtureSyncConfig {
  /// Fetch rosters on every sync instead of only when they are due (never
  /// fetched, or fetched before the season started).
  pub refresh_teams_every_sync: bool,
  /// Only list fixtures from the date of the newest known result onward.
  pub incremental_fixtures:     bool,
}

impl Default for FixtureSyncConfig {
  fn default() -> Self { Self { refresh_teams_every_sync: false, incremental_fixtures: false } }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
  /// Seasons synced per run at most.
  pub max_updates:               usize,
  /// Active seasons not synced for this long become stale again.
  pub stale_after:               TimeDelta,
  /// Wall-clock budget of one run, checked between seasons. `None`
  /// disables it.
  pub run_timeout:               Option<Duration>,
  /// Spend leftover capacity on ended seasons that never finished syncing.
  pub backfill_finished_seasons: bool,
  pub fixtures:                  FixtureSyncConfig,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      max_updates:               1,
      stale_after:               TimeDelta::hours(24),
      run_timeout:               Some(DEFAULT_RUN_TIMEOUT),
      backfill_finished_seasons: true,
      fixtures:                  FixtureSyncConfig::default(),
    }
  }
}
