//! Fixtures and teams as returned by the sports-data source.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Match status, keyed by the source's short status codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureStatus {
  /// `TBD`, `NS`: kickoff not reached (or not yet fixed).
  NotStarted,
  /// `1H`, `HT`, `2H`, `ET`, `BT`, `P`, `LIVE`.
  InPlay,
  /// `SUSP`, `INT`: stopped, expected to resume.
  Interrupted,
  /// `PST`: postponed, will be rescheduled.
  Postponed,
  /// `FT`, `AET`, `PEN`: played to completion.
  Finished,
  /// `AWD`, `WO`: result decided off the pitch.
  Awarded,
  /// `CANC`, `ABD`: will not produce a result.
  Abandoned,
  /// Anything the source adds later.
  Other(String),
}

impl FixtureStatus {
  pub fn from_short(code: &str) -> Self {
    match code {
      "TBD" | "NS" => Self::NotStarted,
      "1H" | "HT" | "2H" | "ET" | "BT" | "P" | "LIVE" => Self::InPlay,
      "SUSP" | "INT" => Self::Interrupted,
      "PST" => Self::Postponed,
      "FT" | "AET" | "PEN" => Self::Finished,
      "AWD" | "WO" => Self::Awarded,
      "CANC" | "ABD" => Self::Abandoned,
      other => Self::Other(other.to_owned()),
    }
  }

  /// The fixture has a final result usable by the model.
  pub fn is_finished(&self) -> bool { matches!(self, Self::Finished | Self::Awarded) }

  /// The fixture is still expected to produce a result.
  pub fn is_pending(&self) -> bool {
    matches!(
      self,
      Self::NotStarted | Self::InPlay | Self::Interrupted | Self::Postponed
    )
  }
}

// ─── Fixture ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
  pub home: Option<u32>,
  pub away: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureSide {
  pub team_id: i64,
  pub name:    String,
}

/// One scheduled game of a season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
  pub fixture_id: i64,
  /// Scheduled kickoff. Used as the game's time for staleness decisions.
  pub kickoff:    DateTime<Utc>,
  pub status:     FixtureStatus,
  pub home:       FixtureSide,
  pub away:       FixtureSide,
  pub halftime:   Score,
  pub fulltime:   Score,
}

impl Fixture {
  /// Kickoff has passed but no result is in yet.
  pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
    self.kickoff <= now && self.status.is_pending()
  }
}

/// Kickoff of the newest finished fixture.
pub fn newest_finished(fixtures: &[Fixture]) -> Option<DateTime<Utc>> {
  fixtures
    .iter()
    .filter(|f| f.status.is_finished())
    .map(|f| f.kickoff)
    .max()
}

/// Whether any finished fixture kicked off strictly after `since`.
pub fn has_finished_after(fixtures: &[Fixture], since: DateTime<Utc>) -> bool {
  fixtures
    .iter()
    .any(|f| f.status.is_finished() && f.kickoff > since)
}

/// The fixture list is current: the season is over, or nothing that should
/// have been played is still waiting for a result.
pub fn fixtures_current(fixtures: &[Fixture], season_end: NaiveDate, now: DateTime<Utc>) -> bool {
  season_end < now.date_naive() || !fixtures.iter().any(|f| f.is_overdue(now))
}

// ─── Team ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
  pub team_id: i64,
  pub name:    String,
  pub code:    Option<String>,
  pub country: Option<String>,
  pub logo:    Option<String>,
}
