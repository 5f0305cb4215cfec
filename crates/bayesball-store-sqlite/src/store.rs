//! [`SqliteStore`]: the SQLite implementation of [`SeasonStore`].

use std::{path::Path, time::Duration};

use bayesball_core::{
  league::League,
  season::{Season, SeasonKey},
  store::{PosteriorHandoff, SeasonStore, SeasonWrite, WriteOutcome},
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use crate::{
  Error, Result,
  encode::{RawLeague, RawSeason, SEASON_COLUMNS, SeasonRow, encode_date, encode_dt},
  schema::SCHEMA,
};

/// How long a writer waits for another connection's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Bayesball record store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// All known leagues ordered by id.
  pub async fn list_leagues(&self) -> Result<Vec<League>> {
    let raws: Vec<RawLeague> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT league_id, name, kind, logo, country_name, country_code, country_flag
           FROM leagues ORDER BY league_id",
        )?;
        let rows = stmt
          .query_map([], RawLeague::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLeague::into_league).collect()
  }

  /// Run a season query bound to `(?1 = today, ?2 = limit)` and decode the
  /// rows.
  async fn query_seasons(&self, sql: String, today: NaiveDate, limit: usize) -> Result<Vec<Season>> {
    let today_str = encode_date(today);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawSeason> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![today_str, limit], RawSeason::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSeason::into_season).collect()
  }
}

// ─── Row helpers (run on the connection thread) ──────────────────────────────

fn select_season(
  conn: &rusqlite::Connection,
  key: SeasonKey,
) -> rusqlite::Result<Option<RawSeason>> {
  conn
    .query_row(
      &format!("SELECT {SEASON_COLUMNS} FROM seasons WHERE league_id = ?1 AND season_year = ?2"),
      rusqlite::params![key.league_id, key.season_year],
      RawSeason::from_row,
    )
    .optional()
}

fn insert_season(conn: &rusqlite::Connection, season: &Season) -> rusqlite::Result<()> {
  let r = SeasonRow::from(season);
  conn.execute(
    &format!(
      "INSERT INTO seasons ({SEASON_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    ),
    rusqlite::params![
      r.league_id,
      r.season_year,
      r.start_date,
      r.end_date,
      r.current,
      r.last_updated_teams,
      r.last_updated_fixtures,
      r.last_updated_posteriors,
      r.newest_finished_at,
      r.data_need_to_update,
      r.posteriors_need_to_update,
      r.discovered_at,
    ],
  )?;
  Ok(())
}

/// Rewrite the static columns only.
fn write_static(conn: &rusqlite::Connection, season: &Season) -> rusqlite::Result<()> {
  let r = SeasonRow::from(season);
  conn.execute(
    "UPDATE seasons SET start_date = ?3, end_date = ?4, is_current = ?5
     WHERE league_id = ?1 AND season_year = ?2",
    rusqlite::params![r.league_id, r.season_year, r.start_date, r.end_date, r.current],
  )?;
  Ok(())
}

/// Rewrite the columns a fixture sync may touch.
fn write_freshness(conn: &rusqlite::Connection, season: &Season) -> rusqlite::Result<()> {
  let r = SeasonRow::from(season);
  conn.execute(
    "UPDATE seasons SET
       last_updated_teams        = ?3,
       last_updated_fixtures     = ?4,
       newest_finished_at        = ?5,
       data_need_to_update       = ?6,
       posteriors_need_to_update = ?7
     WHERE league_id = ?1 AND season_year = ?2",
    rusqlite::params![
      r.league_id,
      r.season_year,
      r.last_updated_teams,
      r.last_updated_fixtures,
      r.newest_finished_at,
      r.data_need_to_update,
      r.posteriors_need_to_update,
    ],
  )?;
  Ok(())
}

/// Rewrite the columns the posterior job owns.
fn write_posteriors(conn: &rusqlite::Connection, season: &Season) -> rusqlite::Result<()> {
  let r = SeasonRow::from(season);
  conn.execute(
    "UPDATE seasons SET last_updated_posteriors = ?3, posteriors_need_to_update = ?4
     WHERE league_id = ?1 AND season_year = ?2",
    rusqlite::params![
      r.league_id,
      r.season_year,
      r.last_updated_posteriors,
      r.posteriors_need_to_update,
    ],
  )?;
  Ok(())
}

/// Apply `write` to the current row. Runs inside an `IMMEDIATE` transaction,
/// so the read and the write see the same row even with other processes
/// writing to the file.
fn apply_season_write(
  conn: &rusqlite::Connection,
  key: SeasonKey,
  write: SeasonWrite,
  now: DateTime<Utc>,
) -> tokio_rusqlite::Result<Result<WriteOutcome>> {
  let current = match select_season(conn, key)?.map(RawSeason::into_season).transpose() {
    Ok(current) => current,
    Err(e) => return Ok(Err(e)),
  };

  let outcome = match (write, current) {
    (SeasonWrite::InsertOnly(_), Some(_)) => return Ok(Err(Error::AlreadyExists(key))),
    (SeasonWrite::InsertOnly(meta) | SeasonWrite::MergeStatic(meta), None) => {
      insert_season(conn, &Season::new(key, meta, now))?;
      WriteOutcome::Inserted
    }
    (SeasonWrite::MergeStatic(meta), Some(current)) => match current.merge_static(&meta) {
      Some(next) => {
        write_static(conn, &next)?;
        WriteOutcome::Updated
      }
      None => WriteOutcome::Unchanged,
    },
    (SeasonWrite::Monotonic(_), None) => return Ok(Err(Error::SeasonNotFound(key))),
    (SeasonWrite::Monotonic(update), Some(current)) => {
      let applied = current.apply(&update);
      let changed = applied.season != current;
      if changed {
        write_freshness(conn, &applied.season)?;
      }
      match (applied.superseded, changed) {
        (true, _) => WriteOutcome::Stale,
        (false, true) => WriteOutcome::Updated,
        (false, false) => WriteOutcome::Unchanged,
      }
    }
  };

  Ok(Ok(outcome))
}

// ─── SeasonStore impl ────────────────────────────────────────────────────────

impl SeasonStore for SqliteStore {
  type Error = Error;

  async fn upsert_league(&self, league: &League) -> Result<WriteOutcome> {
    let id = league.league_id;
    let raw: Option<RawLeague> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT league_id, name, kind, logo, country_name, country_code, country_flag
               FROM leagues WHERE league_id = ?1",
              rusqlite::params![id],
              RawLeague::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    let outcome = match raw.map(RawLeague::into_league).transpose()? {
      Some(existing) if &existing == league => return Ok(WriteOutcome::Unchanged),
      Some(_) => WriteOutcome::Updated,
      None => WriteOutcome::Inserted,
    };

    let league = league.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO leagues
             (league_id, name, kind, logo, country_name, country_code, country_flag)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (league_id) DO UPDATE SET
             name         = excluded.name,
             kind         = excluded.kind,
             logo         = excluded.logo,
             country_name = excluded.country_name,
             country_code = excluded.country_code,
             country_flag = excluded.country_flag",
          rusqlite::params![
            league.league_id,
            league.name,
            league.kind.as_str(),
            league.logo,
            league.country.name,
            league.country.code,
            league.country.flag,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(outcome)
  }

  async fn upsert_season(&self, key: SeasonKey, write: SeasonWrite) -> Result<WriteOutcome> {
    let now = Utc::now();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = apply_season_write(&tx, key, write, now)?;
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await??;

    if outcome == WriteOutcome::Stale {
      tracing::debug!(%key, "fixture sync superseded by a newer one");
    }
    Ok(outcome)
  }

  async fn get_season(&self, key: SeasonKey) -> Result<Option<Season>> {
    let raw: Option<RawSeason> = self
      .conn
      .call(move |conn| Ok(select_season(conn, key)?))
      .await?;

    raw.map(RawSeason::into_season).transpose()
  }

  async fn list_seasons(&self) -> Result<Vec<Season>> {
    let raws: Vec<RawSeason> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SEASON_COLUMNS} FROM seasons ORDER BY league_id, season_year"
        ))?;
        let rows = stmt
          .query_map([], RawSeason::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSeason::into_season).collect()
  }

  async fn mark_stale_active_seasons(
    &self,
    today: NaiveDate,
    synced_before: DateTime<Utc>,
  ) -> Result<usize> {
    let today_str = encode_date(today);
    let cutoff_str = encode_dt(synced_before);

    let marked = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE seasons SET data_need_to_update = 1
           WHERE data_need_to_update = 0
             AND start_date <= ?1 AND end_date >= ?1
             AND last_updated_fixtures < ?2",
          rusqlite::params![today_str, cutoff_str],
        )?)
      })
      .await?;

    Ok(marked)
  }

  async fn query_stale_active_seasons(
    &self,
    today: NaiveDate,
    limit: usize,
  ) -> Result<Vec<Season>> {
    self
      .query_seasons(
        format!(
          "SELECT {SEASON_COLUMNS} FROM seasons
           WHERE data_need_to_update = 1
             AND start_date <= ?1 AND end_date >= ?1
           ORDER BY last_updated_fixtures, league_id, season_year
           LIMIT ?2"
        ),
        today,
        limit,
      )
      .await
  }

  async fn query_backfill_seasons(&self, today: NaiveDate, limit: usize) -> Result<Vec<Season>> {
    self
      .query_seasons(
        format!(
          "SELECT {SEASON_COLUMNS} FROM seasons
           WHERE data_need_to_update = 1
             AND end_date < ?1
           ORDER BY last_updated_fixtures, league_id, season_year
           LIMIT ?2"
        ),
        today,
        limit,
      )
      .await
  }
}

// ─── PosteriorHandoff impl ───────────────────────────────────────────────────

impl PosteriorHandoff for SqliteStore {
  type Error = Error;

  async fn seasons_awaiting_posteriors(&self) -> Result<Vec<Season>> {
    let raws: Vec<RawSeason> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SEASON_COLUMNS} FROM seasons
           WHERE posteriors_need_to_update = 1
           ORDER BY league_id, season_year"
        ))?;
        let rows = stmt
          .query_map([], RawSeason::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSeason::into_season).collect()
  }

  async fn record_posteriors(
    &self,
    key: SeasonKey,
    computed_at: DateTime<Utc>,
  ) -> Result<Option<Season>> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = match select_season(&tx, key)?.map(RawSeason::into_season).transpose() {
          Ok(Some(current)) => current,
          Ok(None) => return Ok(Ok(None)),
          Err(e) => return Ok(Err(e)),
        };

        let next = current.record_posteriors(computed_at);
        if next != current {
          write_posteriors(&tx, &next)?;
          tx.commit()?;
        }
        Ok(Ok(Some(next)))
      })
      .await?
  }
}
