//! Runtime configuration, read from an optional TOML file layered under
//! `BAYESBALL_*` environment variables.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context as _, ensure};
use bayesball_source::SourceConfig;
use bayesball_sync::{DiscoveryConfig, FixtureSyncConfig, SchedulerConfig};
use chrono::TimeDelta;
use serde::Deserialize;

/// Every setting of the binary. Missing keys take their defaults.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub api_key:                          String,
  pub api_base_url:                     String,
  pub api_host:                         String,
  pub request_timeout_seconds:          u64,
  pub sleep_time_between_calls_seconds: u64,
  pub max_calls_per_run:                Option<u32>,

  pub store_path: PathBuf,
  pub blob_dir:   PathBuf,

  pub first_season_year:     i32,
  pub merge_static_metadata: bool,

  pub max_updates:               usize,
  pub stale_after_hours:         i64,
  pub run_timeout_seconds:       Option<u64>,
  pub backfill_finished_seasons: bool,
  pub refresh_teams_every_sync:  bool,
  pub incremental_fixtures:      bool,
}

impl Default for AppConfig {
  fn default() -> Self {
    let source = SourceConfig::default();
    let discovery = DiscoveryConfig::default();
    let scheduler = SchedulerConfig::default();
    Self {
      api_key:                          source.api_key,
      api_base_url:                     source.base_url,
      api_host:                         source.api_host,
      request_timeout_seconds:          source.request_timeout.as_secs(),
      sleep_time_between_calls_seconds: source.call_interval.as_secs(),
      max_calls_per_run:                source.max_calls,

      store_path: PathBuf::from("bayesball.db"),
      blob_dir:   PathBuf::from("raw"),

      first_season_year:     discovery.first_season_year,
      merge_static_metadata: discovery.merge_static_metadata,

      max_updates:               scheduler.max_updates,
      stale_after_hours:         scheduler.stale_after.num_hours(),
      run_timeout_seconds:       scheduler.run_timeout.map(|d| d.as_secs()),
      backfill_finished_seasons: scheduler.backfill_finished_seasons,
      refresh_teams_every_sync:  scheduler.fixtures.refresh_teams_every_sync,
      incremental_fixtures:      scheduler.fixtures.incremental_fixtures,
    }
  }
}

impl AppConfig {
  pub fn source(&self) -> SourceConfig {
    SourceConfig {
      base_url:        self.api_base_url.clone(),
      api_host:        self.api_host.clone(),
      api_key:         self.api_key.clone(),
      request_timeout: Duration::from_secs(self.request_timeout_seconds),
      call_interval:   Duration::from_secs(self.sleep_time_between_calls_seconds),
      max_calls:       self.max_calls_per_run,
    }
  }

  pub fn discovery(&self) -> DiscoveryConfig {
    DiscoveryConfig {
      first_season_year:     self.first_season_year,
      merge_static_metadata: self.merge_static_metadata,
    }
  }

  pub fn scheduler(&self) -> anyhow::Result<SchedulerConfig> {
    ensure!(self.stale_after_hours >= 0, "stale_after_hours must not be negative");
    let stale_after = TimeDelta::try_hours(self.stale_after_hours)
      .with_context(|| format!("stale_after_hours out of range: {}", self.stale_after_hours))?;

    Ok(SchedulerConfig {
      max_updates:               self.max_updates,
      stale_after,
      run_timeout:               self.run_timeout_seconds.map(Duration::from_secs),
      backfill_finished_seasons: self.backfill_finished_seasons,
      fixtures:                  FixtureSyncConfig {
        refresh_teams_every_sync: self.refresh_teams_every_sync,
        incremental_fixtures:     self.incremental_fixtures,
      },
    })
  }
}
