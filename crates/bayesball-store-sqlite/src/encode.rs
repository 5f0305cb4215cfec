//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with exactly six fractional
//! digits and a `Z` suffix. The fixed width keeps lexical and chronological
//! order identical, which the staleness index relies on. Calendar dates are
//! stored as `YYYY-MM-DD`.

use bayesball_core::{
  league::{Country, League, LeagueKind},
  season::{Season, SeasonKey, SeasonMeta},
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawSeason::from_row`].
pub const SEASON_COLUMNS: &str = "league_id, season_year, start_date, end_date, is_current,
   last_updated_teams, last_updated_fixtures, last_updated_posteriors,
   newest_finished_at, data_need_to_update, posteriors_need_to_update,
   discovered_at";

/// Raw values read directly from a `seasons` row.
pub struct RawSeason {
  pub league_id:                 i64,
  pub season_year:               i32,
  pub start_date:                String,
  pub end_date:                  String,
  pub current:                   bool,
  pub last_updated_teams:        String,
  pub last_updated_fixtures:     String,
  pub last_updated_posteriors:   String,
  pub newest_finished_at:        Option<String>,
  pub data_need_to_update:       bool,
  pub posteriors_need_to_update: bool,
  pub discovered_at:             String,
}

impl RawSeason {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      league_id:                 row.get(0)?,
      season_year:               row.get(1)?,
      start_date:                row.get(2)?,
      end_date:                  row.get(3)?,
      current:                   row.get(4)?,
      last_updated_teams:        row.get(5)?,
      last_updated_fixtures:     row.get(6)?,
      last_updated_posteriors:   row.get(7)?,
      newest_finished_at:        row.get(8)?,
      data_need_to_update:       row.get(9)?,
      posteriors_need_to_update: row.get(10)?,
      discovered_at:             row.get(11)?,
    })
  }

  pub fn into_season(self) -> Result<Season> {
    let meta = SeasonMeta::new(
      decode_date(&self.start_date)?,
      decode_date(&self.end_date)?,
      self.current,
    )?;

    Ok(Season {
      key: SeasonKey::new(self.league_id, self.season_year),
      meta,
      last_updated_teams: decode_dt(&self.last_updated_teams)?,
      last_updated_fixtures: decode_dt(&self.last_updated_fixtures)?,
      last_updated_posteriors: decode_dt(&self.last_updated_posteriors)?,
      newest_finished_at: self
        .newest_finished_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      data_need_to_update: self.data_need_to_update,
      posteriors_need_to_update: self.posteriors_need_to_update,
      discovered_at: decode_dt(&self.discovered_at)?,
    })
  }
}

/// A season flattened into owned column values, ready to bind.
pub struct SeasonRow {
  pub league_id:                 i64,
  pub season_year:               i32,
  pub start_date:                String,
  pub end_date:                  String,
  pub current:                   bool,
  pub last_updated_teams:        String,
  pub last_updated_fixtures:     String,
  pub last_updated_posteriors:   String,
  pub newest_finished_at:        Option<String>,
  pub data_need_to_update:       bool,
  pub posteriors_need_to_update: bool,
  pub discovered_at:             String,
}

impl From<&Season> for SeasonRow {
  fn from(s: &Season) -> Self {
    Self {
      league_id:                 s.key.league_id,
      season_year:               s.key.season_year,
      start_date:                encode_date(s.meta.start_date),
      end_date:                  encode_date(s.meta.end_date),
      current:                   s.meta.current,
      last_updated_teams:        encode_dt(s.last_updated_teams),
      last_updated_fixtures:     encode_dt(s.last_updated_fixtures),
      last_updated_posteriors:   encode_dt(s.last_updated_posteriors),
      newest_finished_at:        s.newest_finished_at.map(encode_dt),
      data_need_to_update:       s.data_need_to_update,
      posteriors_need_to_update: s.posteriors_need_to_update,
      discovered_at:             encode_dt(s.discovered_at),
    }
  }
}

/// Raw values read directly from a `leagues` row.
pub struct RawLeague {
  pub league_id:    i64,
  pub name:         String,
  pub kind:         String,
  pub logo:         Option<String>,
  pub country_name: String,
  pub country_code: Option<String>,
  pub country_flag: Option<String>,
}

impl RawLeague {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      league_id:    row.get(0)?,
      name:         row.get(1)?,
      kind:         row.get(2)?,
      logo:         row.get(3)?,
      country_name: row.get(4)?,
      country_code: row.get(5)?,
      country_flag: row.get(6)?,
    })
  }

  pub fn into_league(self) -> Result<League> {
    Ok(League {
      league_id: self.league_id,
      name:      self.name,
      kind:      LeagueKind::parse(&self.kind)?,
      logo:      self.logo,
      country:   Country {
        name: self.country_name,
        code: self.country_code,
        flag: self.country_flag,
      },
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let early = encode_dt(Utc.with_ymd_and_hms(2024, 9, 1, 9, 0, 0).unwrap());
    let late = encode_dt(Utc.with_ymd_and_hms(2024, 9, 1, 10, 0, 0).unwrap());
    let epoch = encode_dt(bayesball_core::season::EPOCH);
    assert_eq!(epoch, "1970-01-01T00:00:00.000000Z");
    assert!(epoch < early && early < late);
    assert_eq!(early.len(), late.len());
  }

  #[test]
  fn date_round_trip_rejects_garbage() {
    let d = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
    assert_eq!(decode_date(&encode_date(d)).unwrap(), d);
    assert!(matches!(decode_date("01/08/2024"), Err(Error::DateParse(_))));
  }
}
