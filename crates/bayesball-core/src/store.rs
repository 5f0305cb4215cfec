//! The `SeasonStore` trait and the posterior hand-off boundary.
//!
//! The trait is implemented by storage backends (e.g.
//! `bayesball-store-sqlite`). The sync jobs depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
  Classify,
  league::League,
  season::{FreshnessUpdate, Season, SeasonKey, SeasonMeta},
};

// ─── Write modes ─────────────────────────────────────────────────────────────

/// The three ways a season record may be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonWrite {
  /// Insert a new season; fails with a conflict if the key exists.
  InsertOnly(SeasonMeta),
  /// Insert a new season, or update only the static fields of an existing
  /// one. Freshness and flag fields are never touched.
  MergeStatic(SeasonMeta),
  /// Merge a fixture sync result into an existing season (see
  /// [`Season::apply`]).
  Monotonic(FreshnessUpdate),
}

/// What a write did to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  Inserted,
  Updated,
  /// The record already held everything the write carried; nothing was
  /// written.
  Unchanged,
  /// A newer fixture sync had already been recorded. Monotonic fields were
  /// still merged by max.
  Stale,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the durable table of per-season sync state.
///
/// Every season write is an idempotent merge, so overlapping job runs
/// converge without any locking between them. Seasons are never deleted.
pub trait SeasonStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// Insert a league or update its static metadata.
  fn upsert_league<'a>(
    &'a self,
    league: &'a League,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// Write a season record in the given mode.
  fn upsert_season(
    &self,
    key: SeasonKey,
    write: SeasonWrite,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;

  /// Retrieve a season by key. Returns `None` if not found.
  fn get_season(
    &self,
    key: SeasonKey,
  ) -> impl Future<Output = Result<Option<Season>, Self::Error>> + Send + '_;

  /// All seasons ordered by key.
  fn list_seasons(&self) -> impl Future<Output = Result<Vec<Season>, Self::Error>> + Send + '_;

  /// Flag every season active on `today` whose fixtures were last synced
  /// before `synced_before` as needing an update. Returns how many seasons
  /// re-entered the stale state.
  fn mark_stale_active_seasons(
    &self,
    today: NaiveDate,
    synced_before: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Up to `limit` flagged seasons active on `today`, stalest first, ties
  /// broken by key.
  fn query_stale_active_seasons(
    &self,
    today: NaiveDate,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Season>, Self::Error>> + Send + '_;

  /// Up to `limit` flagged seasons that ended before `today`, stalest
  /// first. These were never completely synced while active.
  fn query_backfill_seasons(
    &self,
    today: NaiveDate,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Season>, Self::Error>> + Send + '_;
}

// ─── Posterior hand-off ──────────────────────────────────────────────────────

/// The contract surface toward the external posterior job.
///
/// The sync jobs never use this trait: they only ever raise
/// `posteriors_need_to_update`. Lowering it is the posterior job's call.
pub trait PosteriorHandoff: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// Seasons whose posteriors are out of date, ordered by key.
  fn seasons_awaiting_posteriors(
    &self,
  ) -> impl Future<Output = Result<Vec<Season>, Self::Error>> + Send + '_;

  /// Record a posterior computation covering data up to `computed_at` (see
  /// [`Season::record_posteriors`]). Returns the updated season, or `None`
  /// if the key is unknown.
  fn record_posteriors(
    &self,
    key: SeasonKey,
    computed_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Season>, Self::Error>> + Send + '_;
}
