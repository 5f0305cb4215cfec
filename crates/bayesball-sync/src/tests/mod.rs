//! Job tests against a scripted source, the in-memory blob sink and an
//! in-memory SQLite store.

mod discovery;

use std::{collections::HashMap, sync::Mutex};

use bayesball_blob::MemoryBlobSink;
use bayesball_core::{
  Classify, ErrorKind,
  blob::{BlobKey, BlobSink, PutOutcome},
  fixture::{Fixture, FixtureSide, FixtureStatus, Score, Team},
  league::{CatalogEntry, League},
  season::{FreshnessUpdate, Season, SeasonKey, SeasonMeta},
  source::{Page, PageCursor, SportsSource},
  store::{SeasonStore, SeasonWrite, WriteOutcome},
};
use bayesball_store_sqlite::SqliteStore;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

// ─── Scripted source ─────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("scripted {0:?}")]
pub struct FakeError(ErrorKind);

impl Classify for FakeError {
  fn kind(&self) -> ErrorKind { self.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
  Catalog,
  Teams,
  Fixtures,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
  pub endpoint: Endpoint,
  pub key:      Option<SeasonKey>,
  pub since:    Option<NaiveDate>,
  pub page:     u32,
}

/// A [`SportsSource`] replaying canned pages. Seasons without scripted pages
/// answer with a single empty page.
#[derive(Default)]
pub struct FakeSource {
  catalog:  Vec<CatalogEntry>,
  teams:    HashMap<SeasonKey, Vec<Vec<Team>>>,
  fixtures: HashMap<SeasonKey, Vec<Vec<Fixture>>>,
  failures: HashMap<(Option<SeasonKey>, Endpoint), ErrorKind>,
  calls:    Mutex<Vec<Call>>,
}

impl FakeSource {
  pub fn new() -> Self { Self::default() }

  pub fn with_catalog(mut self, catalog: Vec<CatalogEntry>) -> Self {
    self.catalog = catalog;
    self
  }

  pub fn with_teams(mut self, key: SeasonKey, pages: Vec<Vec<Team>>) -> Self {
    self.teams.insert(key, pages);
    self
  }

  pub fn with_fixtures(mut self, key: SeasonKey, pages: Vec<Vec<Fixture>>) -> Self {
    self.fixtures.insert(key, pages);
    self
  }

  pub fn failing(mut self, key: Option<SeasonKey>, endpoint: Endpoint, kind: ErrorKind) -> Self {
    self.failures.insert((key, endpoint), kind);
    self
  }

  pub fn calls(&self) -> Vec<Call> { self.calls.lock().unwrap().clone() }

  fn record(&self, call: Call) -> Result<(), FakeError> {
    let failure = self.failures.get(&(call.key, call.endpoint)).copied();
    self.calls.lock().unwrap().push(call);
    match failure {
      Some(kind) => Err(FakeError(kind)),
      None => Ok(()),
    }
  }
}

fn page_of<T: Clone + serde::Serialize>(
  key: SeasonKey,
  pages: Option<&Vec<Vec<T>>>,
  cursor: PageCursor,
) -> Page<T> {
  let empty = Vec::new();
  let all = pages.map_or(&empty, |p| p);
  let index = cursor.number() as usize - 1;
  let items = all.get(index).cloned().unwrap_or_default();
  let raw = serde_json::to_vec(&serde_json::json!({
    "league": key.league_id,
    "season": key.season_year,
    "page": cursor.number(),
    "response": items,
  }))
  .unwrap();

  Page {
    cursor,
    items,
    raw: Bytes::from(raw),
    next: (index + 1 < all.len()).then(|| PageCursor(cursor.number() + 1)),
  }
}

impl SportsSource for FakeSource {
  type Error = FakeError;

  async fn list_leagues_and_seasons(&self) -> Result<Vec<CatalogEntry>, FakeError> {
    self.record(Call { endpoint: Endpoint::Catalog, key: None, since: None, page: 1 })?;
    Ok(self.catalog.clone())
  }

  async fn list_teams(&self, key: SeasonKey, cursor: PageCursor) -> Result<Page<Team>, FakeError> {
    self.record(Call {
      endpoint: Endpoint::Teams,
      key:      Some(key),
      since:    None,
      page:     cursor.number(),
    })?;
    Ok(page_of(key, self.teams.get(&key), cursor))
  }

  async fn list_fixtures(
    &self,
    key: SeasonKey,
    since: Option<NaiveDate>,
    cursor: PageCursor,
  ) -> Result<Page<Fixture>, FakeError> {
    self.record(Call {
      endpoint: Endpoint::Fixtures,
      key: Some(key),
      since,
      page: cursor.number(),
    })?;
    let mut page = page_of(key, self.fixtures.get(&key), cursor);
    if let Some(since) = since {
      page.items.retain(|f| f.kickoff.date_naive() >= since);
    }
    Ok(page)
  }
}

// ─── Failing backends ────────────────────────────────────────────────────────

/// An in-memory store whose season writes fail for scripted keys.
pub struct FlakyStore {
  inner:    SqliteStore,
  failures: HashMap<SeasonKey, ErrorKind>,
}

impl FlakyStore {
  pub async fn new() -> Self { Self { inner: store().await, failures: HashMap::new() } }

  pub fn failing(mut self, key: SeasonKey, kind: ErrorKind) -> Self {
    self.failures.insert(key, kind);
    self
  }

  pub fn inner(&self) -> &SqliteStore { &self.inner }
}

fn scripted<E: Classify>(e: E) -> FakeError { FakeError(e.kind()) }

impl SeasonStore for FlakyStore {
  type Error = FakeError;

  async fn upsert_league(&self, league: &League) -> Result<WriteOutcome, FakeError> {
    self.inner.upsert_league(league).await.map_err(scripted)
  }

  async fn upsert_season(&self, key: SeasonKey, write: SeasonWrite) -> Result<WriteOutcome, FakeError> {
    if let Some(kind) = self.failures.get(&key) {
      return Err(FakeError(*kind));
    }
    self.inner.upsert_season(key, write).await.map_err(scripted)
  }

  async fn get_season(&self, key: SeasonKey) -> Result<Option<Season>, FakeError> {
    self.inner.get_season(key).await.map_err(scripted)
  }

  async fn list_seasons(&self) -> Result<Vec<Season>, FakeError> {
    self.inner.list_seasons().await.map_err(scripted)
  }

  async fn mark_stale_active_seasons(
    &self,
    today: NaiveDate,
    synced_before: DateTime<Utc>,
  ) -> Result<usize, FakeError> {
    self
      .inner
      .mark_stale_active_seasons(today, synced_before)
      .await
      .map_err(scripted)
  }

  async fn query_stale_active_seasons(
    &self,
    today: NaiveDate,
    limit: usize,
  ) -> Result<Vec<Season>, FakeError> {
    self
      .inner
      .query_stale_active_seasons(today, limit)
      .await
      .map_err(scripted)
  }

  async fn query_backfill_seasons(&self, today: NaiveDate, limit: usize) -> Result<Vec<Season>, FakeError> {
    self.inner.query_backfill_seasons(today, limit).await.map_err(scripted)
  }
}

/// A blob sink that fails every write with the given kind.
pub struct FailingBlobs(pub ErrorKind);

impl BlobSink for FailingBlobs {
  type Error = FakeError;

  async fn put_immutable(&self, _key: &BlobKey, _payload: Bytes) -> Result<PutOutcome, FakeError> {
    Err(FakeError(self.0))
  }
}

// ─── Fixtures and helpers ────────────────────────────────────────────────────

pub async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

pub fn blobs() -> MemoryBlobSink { MemoryBlobSink::new() }

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

/// Noon on the given day of September 2024.
pub fn day(n: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 9, n, 12, 0, 0).unwrap() }

/// The run time used by most tests.
pub fn now() -> DateTime<Utc> { day(10) }

pub fn active_meta() -> SeasonMeta {
  SeasonMeta::new(date(2024, 8, 1), date(2025, 5, 31), true).unwrap()
}

pub fn ended_meta() -> SeasonMeta {
  SeasonMeta::new(date(2023, 8, 1), date(2024, 5, 31), false).unwrap()
}

/// Insert a season and, with `synced`, record a fixture sync at that time
/// that left it stale.
pub async fn seed(s: &SqliteStore, key: SeasonKey, meta: SeasonMeta, synced: Option<DateTime<Utc>>) {
  s.upsert_season(key, SeasonWrite::MergeStatic(meta)).await.unwrap();
  if let Some(at) = synced {
    s.upsert_season(
      key,
      SeasonWrite::Monotonic(FreshnessUpdate {
        teams_at: Some(at),
        fixtures_at: Some(at),
        ..Default::default()
      }),
    )
    .await
    .unwrap();
  }
}

pub fn team(id: i64, name: &str) -> Team {
  Team {
    team_id: id,
    name:    name.into(),
    code:    None,
    country: Some("England".into()),
    logo:    None,
  }
}

pub fn fixture(id: i64, kickoff: DateTime<Utc>, status: &str) -> Fixture {
  let finished = FixtureStatus::from_short(status).is_finished();
  let goals = |n| if finished { Some(n) } else { None };
  Fixture {
    fixture_id: id,
    kickoff,
    status: FixtureStatus::from_short(status),
    home: FixtureSide { team_id: 33, name: "Manchester United".into() },
    away: FixtureSide { team_id: 36, name: "Fulham".into() },
    halftime: Score { home: goals(0), away: goals(0) },
    fulltime: Score { home: goals(1), away: goals(0) },
  }
}
