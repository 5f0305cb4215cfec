//! Response shapes of the api-football v3 endpoints.
//!
//! Every endpoint wraps its payload in the same envelope. `errors` is `[]`
//! on success and an object keyed by error class otherwise, e.g.
//! `{"rateLimit": "Too many requests..."}`.

use bayesball_core::{
  fixture::{Fixture, FixtureSide, FixtureStatus, Score, Team},
  league::{CatalogEntry, CatalogSeason, Country, League, LeagueKind},
  season::SeasonMeta,
};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  #[serde(default)]
  pub errors:   Value,
  #[serde(default)]
  pub paging:   Paging,
  #[serde(default = "Vec::new")]
  pub response: Vec<T>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct Paging {
  #[serde(default)]
  pub current: u32,
  #[serde(default)]
  pub total:   u32,
}

impl Paging {
  /// Page number following this one, if any.
  pub fn next(self) -> Option<u32> {
    (self.current > 0 && self.current < self.total).then_some(self.current + 1)
  }
}

/// Turn a non-empty `errors` field into an error.
pub fn check_errors(endpoint: &'static str, errors: &Value) -> Result<()> {
  let entries: Vec<(String, String)> = match errors {
    Value::Object(map) => map
      .iter()
      .map(|(k, v)| (k.clone(), v.as_str().map_or_else(|| v.to_string(), str::to_owned)))
      .collect(),
    Value::Array(items) => items
      .iter()
      .map(|v| ("error".to_owned(), v.as_str().map_or_else(|| v.to_string(), str::to_owned)))
      .collect(),
    Value::String(s) if !s.is_empty() => vec![("error".to_owned(), s.clone())],
    _ => Vec::new(),
  };

  if entries.is_empty() {
    return Ok(());
  }

  let message = entries
    .iter()
    .map(|(k, v)| format!("{k}: {v}"))
    .collect::<Vec<_>>()
    .join("; ");

  if entries.iter().any(|(k, _)| k == "rateLimit" || k == "requests") {
    Err(Error::RateLimited { endpoint, message })
  } else {
    Err(Error::Api { endpoint, message })
  }
}

// ─── /leagues ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LeagueEntry {
  pub league:  LeagueInfo,
  #[serde(default)]
  pub country: CountryInfo,
  #[serde(default)]
  pub seasons: Vec<SeasonInfo>,
}

#[derive(Debug, Deserialize)]
pub struct LeagueInfo {
  pub id:   i64,
  pub name: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub logo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CountryInfo {
  #[serde(default)]
  pub name: String,
  pub code: Option<String>,
  pub flag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeasonInfo {
  pub year:     i32,
  pub start:    NaiveDate,
  pub end:      NaiveDate,
  #[serde(default)]
  pub current:  bool,
  #[serde(default)]
  pub coverage: Coverage,
}

#[derive(Debug, Default, Deserialize)]
pub struct Coverage {
  #[serde(default)]
  pub fixtures: FixtureCoverage,
}

#[derive(Debug, Default, Deserialize)]
pub struct FixtureCoverage {
  #[serde(default)]
  pub events: bool,
}

impl LeagueEntry {
  /// Convert to a catalog entry. Entries with an unknown competition type
  /// are dropped, as are seasons whose window ends before it starts.
  pub fn into_catalog(self) -> Option<CatalogEntry> {
    let kind = match LeagueKind::parse(&self.league.kind) {
      Ok(kind) => kind,
      Err(e) => {
        tracing::warn!(league_id = self.league.id, "skipping league: {e}");
        return None;
      }
    };

    let league_id = self.league.id;
    let seasons = self
      .seasons
      .into_iter()
      .filter_map(|s| match SeasonMeta::new(s.start, s.end, s.current) {
        Ok(meta) => Some(CatalogSeason {
          year: s.year,
          meta,
          covers_fixture_events: s.coverage.fixtures.events,
        }),
        Err(e) => {
          tracing::warn!(league_id, year = s.year, "skipping season: {e}");
          None
        }
      })
      .collect();

    Some(CatalogEntry {
      league: League {
        league_id,
        name: self.league.name,
        kind,
        logo: self.league.logo,
        country: Country {
          name: self.country.name,
          code: self.country.code,
          flag: self.country.flag,
        },
      },
      seasons,
    })
  }
}

// ─── /teams ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TeamEntry {
  pub team: TeamInfo,
}

#[derive(Debug, Deserialize)]
pub struct TeamInfo {
  pub id:      i64,
  pub name:    String,
  pub code:    Option<String>,
  pub country: Option<String>,
  pub logo:    Option<String>,
}

impl From<TeamEntry> for Team {
  fn from(e: TeamEntry) -> Self {
    Self {
      team_id: e.team.id,
      name:    e.team.name,
      code:    e.team.code,
      country: e.team.country,
      logo:    e.team.logo,
    }
  }
}

// ─── /fixtures ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FixtureEntry {
  pub fixture: FixtureInfo,
  pub teams:   Sides,
  #[serde(default)]
  pub score:   ScoreInfo,
}

#[derive(Debug, Deserialize)]
pub struct FixtureInfo {
  pub id:     i64,
  pub date:   DateTime<FixedOffset>,
  pub status: StatusInfo,
}

#[derive(Debug, Deserialize)]
pub struct StatusInfo {
  pub short: String,
}

#[derive(Debug, Deserialize)]
pub struct Sides {
  pub home: SideInfo,
  pub away: SideInfo,
}

#[derive(Debug, Deserialize)]
pub struct SideInfo {
  pub id:   i64,
  pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScoreInfo {
  #[serde(default)]
  pub halftime: Goals,
  #[serde(default)]
  pub fulltime: Goals,
}

#[derive(Debug, Default, Deserialize)]
pub struct Goals {
  pub home: Option<u32>,
  pub away: Option<u32>,
}

impl From<Goals> for Score {
  fn from(g: Goals) -> Self { Self { home: g.home, away: g.away } }
}

impl From<SideInfo> for FixtureSide {
  fn from(s: SideInfo) -> Self { Self { team_id: s.id, name: s.name } }
}

impl From<FixtureEntry> for Fixture {
  fn from(e: FixtureEntry) -> Self {
    Self {
      fixture_id: e.fixture.id,
      kickoff:    e.fixture.date.with_timezone(&Utc),
      status:     FixtureStatus::from_short(&e.fixture.status.short),
      home:       e.teams.home.into(),
      away:       e.teams.away.into(),
      halftime:   e.score.halftime.into(),
      fulltime:   e.score.fulltime.into(),
    }
  }
}
