//! Season, the unit of staleness tracking.
//!
//! Every mutation of a season record is expressed as a pure merge of the
//! stored value with an incoming write. The merges only move timestamps
//! forward and only ever raise `posteriors_need_to_update`, so duplicate or
//! interleaved job runs converge to the same record regardless of order.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Freshness timestamps of a season that was never synced.
pub const EPOCH: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

// ─── Key ─────────────────────────────────────────────────────────────────────

/// Composite primary key of a season record.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SeasonKey {
  pub league_id:   i64,
  pub season_year: i32,
}

impl SeasonKey {
  pub fn new(league_id: i64, season_year: i32) -> Self {
    Self { league_id, season_year }
  }
}

impl fmt::Display for SeasonKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.league_id, self.season_year)
  }
}

// ─── Static metadata ─────────────────────────────────────────────────────────

/// The fields of a season that only discovery may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonMeta {
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
  /// The source's own "current season" marker. Informational only; activity
  /// is always derived from the date window.
  pub current:    bool,
}

impl SeasonMeta {
  pub fn new(start_date: NaiveDate, end_date: NaiveDate, current: bool) -> Result<Self> {
    if end_date < start_date {
      return Err(Error::InvalidSeasonWindow { start: start_date, end: end_date });
    }
    Ok(Self { start_date, end_date, current })
  }
}

// ─── Season ──────────────────────────────────────────────────────────────────

/// Where a season sits in the fixture-freshness state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
  /// Discovered, never synced.
  New,
  /// Waiting to be picked up by the scheduler.
  Stale,
  Fresh,
}

/// The persisted sync state of one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
  pub key:                       SeasonKey,
  #[serde(flatten)]
  pub meta:                      SeasonMeta,
  pub last_updated_teams:        DateTime<Utc>,
  pub last_updated_fixtures:     DateTime<Utc>,
  /// Written only by the external posterior job.
  pub last_updated_posteriors:   DateTime<Utc>,
  /// Kickoff of the newest finished fixture seen so far.
  pub newest_finished_at:        Option<DateTime<Utc>>,
  pub data_need_to_update:       bool,
  /// The readiness signal consumed by the posterior job. Raised by fixture
  /// syncs, lowered only through [`crate::store::PosteriorHandoff`].
  pub posteriors_need_to_update: bool,
  pub discovered_at:             DateTime<Utc>,
}

impl Season {
  /// A freshly discovered season: stale, never synced, no pending posteriors.
  pub fn new(key: SeasonKey, meta: SeasonMeta, discovered_at: DateTime<Utc>) -> Self {
    Self {
      key,
      meta,
      last_updated_teams: EPOCH,
      last_updated_fixtures: EPOCH,
      last_updated_posteriors: EPOCH,
      newest_finished_at: None,
      data_need_to_update: true,
      posteriors_need_to_update: false,
      discovered_at,
    }
  }

  /// `today` falls inside `[start_date, end_date]`.
  pub fn is_active(&self, today: NaiveDate) -> bool {
    self.meta.start_date <= today && today <= self.meta.end_date
  }

  pub fn has_ended(&self, today: NaiveDate) -> bool { self.meta.end_date < today }

  pub fn freshness(&self) -> Freshness {
    if !self.data_need_to_update {
      Freshness::Fresh
    } else if self.last_updated_fixtures == EPOCH {
      Freshness::New
    } else {
      Freshness::Stale
    }
  }

  /// Rosters are due when they were never fetched, or were fetched before the
  /// season started (pre-season squads change).
  pub fn teams_due(&self) -> bool {
    let season_start = self.meta.start_date.and_time(NaiveTime::MIN).and_utc();
    self.last_updated_teams < season_start
  }

  /// Merge re-discovered static metadata. Returns `None` when nothing changed
  /// so the store can skip the write entirely.
  pub fn merge_static(&self, meta: &SeasonMeta) -> Option<Season> {
    if &self.meta == meta {
      return None;
    }
    Some(Season { meta: meta.clone(), ..self.clone() })
  }

  /// Merge the result of a fixture sync.
  ///
  /// Timestamps advance by max. `data_need_to_update` is cleared only when
  /// the sync reports current data and is not older than what is already
  /// stored. `posteriors_need_to_update` is raised when a finished game is
  /// newer than the last posterior computation and is never lowered here.
  pub fn apply(&self, update: &FreshnessUpdate) -> Applied {
    let mut next = self.clone();
    let mut superseded = false;

    if let Some(at) = update.teams_at {
      next.last_updated_teams = next.last_updated_teams.max(at);
    }

    if let Some(at) = update.fixtures_at {
      superseded = at < self.last_updated_fixtures;
      next.last_updated_fixtures = next.last_updated_fixtures.max(at);
      if update.data_current && !superseded {
        next.data_need_to_update = false;
      }
    }

    if let Some(at) = update.newest_finished_at {
      next.newest_finished_at = Some(next.newest_finished_at.map_or(at, |cur| cur.max(at)));
      if at > self.last_updated_posteriors {
        next.posteriors_need_to_update = true;
      }
    }

    Applied { season: next, superseded }
  }

  // ── Posterior hand-off ────────────────────────────────────────────────

  /// Record that posteriors were computed from data up to `computed_at`.
  ///
  /// The flag is lowered only if no finished game newer than `computed_at`
  /// has been seen; otherwise the posterior job has to run again.
  pub fn record_posteriors(&self, computed_at: DateTime<Utc>) -> Season {
    let mut next = self.clone();
    next.last_updated_posteriors = next.last_updated_posteriors.max(computed_at);
    let covered = next
      .newest_finished_at
      .is_none_or(|newest| newest <= next.last_updated_posteriors);
    if covered {
      next.posteriors_need_to_update = false;
    }
    next
  }
}

// ─── Freshness update ────────────────────────────────────────────────────────

/// What a fixture sync learned about a season. `None` fields were not
/// fetched and leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreshnessUpdate {
  pub teams_at:           Option<DateTime<Utc>>,
  pub fixtures_at:        Option<DateTime<Utc>>,
  pub newest_finished_at: Option<DateTime<Utc>>,
  /// Every fixture that should have a result has one (or the season is over).
  pub data_current:       bool,
}

impl FreshnessUpdate {
  /// Only the roster was fetched.
  pub fn teams_only(at: DateTime<Utc>) -> Self {
    Self { teams_at: Some(at), ..Self::default() }
  }
}

/// Result of [`Season::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
  pub season:     Season,
  /// A newer fixture sync had already been recorded.
  pub superseded: bool,
}
