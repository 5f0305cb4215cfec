//! The per-season fixture sync routine.

use bayesball_core::{
  Classify as _,
  blob::{BlobKey, BlobSink, PayloadKind},
  fixture::{Fixture, fixtures_current, has_finished_after, newest_finished},
  season::{FreshnessUpdate, Season, SeasonKey},
  source::{Page, PageCursor, SportsSource},
  store::{SeasonStore, SeasonWrite, WriteOutcome},
};
use chrono::{DateTime, NaiveDate, Utc};

use crate::{Error, FixtureSyncConfig, Result};

/// What one successful season sync did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonSyncOutcome {
  pub key:                SeasonKey,
  /// Number of teams, `None` when rosters were not due.
  pub teams:              Option<usize>,
  pub fixtures:           usize,
  pub pages_archived:     usize,
  pub newest_finished_at: Option<DateTime<Utc>>,
  /// No fixture is still waiting for a result.
  pub data_current:       bool,
  /// A result newer than the last posterior computation came in.
  pub posteriors_flagged: bool,
  pub write:              WriteOutcome,
}

/// Archive one fetched page under the run's fetch timestamp.
async fn archive<B, T>(
  blobs: &B,
  key: SeasonKey,
  kind: PayloadKind,
  fetched_at: DateTime<Utc>,
  page: &Page<T>,
) -> Result<()>
where
  B: BlobSink,
{
  let blob_key = BlobKey { season: key, fetched_at, kind, page: page.cursor.number() };
  blobs
    .put_immutable(&blob_key, page.raw.clone())
    .await
    .map_err(Error::from_blob)?;
  Ok(())
}

/// Follow-up cursor, refusing to move backwards so a misbehaving source
/// cannot loop forever.
fn next_cursor<T>(page: &Page<T>) -> Option<PageCursor> {
  page.next.filter(|next| *next > page.cursor)
}

/// Sync one season: fetch its rosters (when due) and fixtures, archive every
/// raw page, then merge the result into the season record in one write.
///
/// Any failure leaves the record untouched, except that rosters fetched
/// before a fixture failure are still recorded. The stored
/// `data_need_to_update` flag is only cleared when no fixture that should
/// have been played is still waiting for a result.
#[tracing::instrument(
  skip_all,
  fields(league_id = season.key.league_id, season_year = season.key.season_year)
)]
pub async fn sync_season<Src, St, B>(
  source: &Src,
  store: &St,
  blobs: &B,
  cfg: &FixtureSyncConfig,
  season: &Season,
  now: DateTime<Utc>,
) -> Result<SeasonSyncOutcome>
where
  Src: SportsSource,
  St: SeasonStore,
  B: BlobSink,
{
  let key = season.key;
  let mut pages_archived = 0;

  // ── Rosters ───────────────────────────────────────────────────────────

  let teams = if cfg.refresh_teams_every_sync || season.teams_due() {
    let mut count = 0;
    let mut cursor = Some(PageCursor::FIRST);
    while let Some(current) = cursor {
      let page = source.list_teams(key, current).await.map_err(Error::from_source)?;
      archive(blobs, key, PayloadKind::Teams, now, &page).await?;
      pages_archived += 1;
      count += page.items.len();
      cursor = next_cursor(&page);
    }
    Some(count)
  } else {
    None
  };

  // ── Fixtures ──────────────────────────────────────────────────────────

  let since = if cfg.incremental_fixtures {
    season.newest_finished_at.map(|at| at.date_naive())
  } else {
    None
  };

  let mut fixtures: Vec<Fixture> = Vec::new();
  let mut cursor = Some(PageCursor::FIRST);
  while let Some(current) = cursor {
    let page = match fixtures_page(source, blobs, key, since, current, now).await {
      Ok(page) => page,
      Err(e) => {
        if teams.is_some() {
          record_teams_only(store, key, now).await?;
        }
        return Err(e);
      }
    };

    pages_archived += 1;
    cursor = next_cursor(&page);
    fixtures.extend(page.items);
  }

  // ── Record ────────────────────────────────────────────────────────────

  let newest = newest_finished(&fixtures);
  let data_current = fixtures_current(&fixtures, season.meta.end_date, now);
  let update = FreshnessUpdate {
    teams_at: teams.map(|_| now),
    fixtures_at: Some(now),
    newest_finished_at: newest,
    data_current,
  };

  let write = store
    .upsert_season(key, SeasonWrite::Monotonic(update))
    .await
    .map_err(Error::from_store)?;

  let outcome = SeasonSyncOutcome {
    key,
    teams,
    fixtures: fixtures.len(),
    pages_archived,
    newest_finished_at: newest,
    data_current,
    posteriors_flagged: has_finished_after(&fixtures, season.last_updated_posteriors),
    write,
  };

  tracing::debug!(
    fixtures = outcome.fixtures,
    pages = outcome.pages_archived,
    data_current,
    posteriors_flagged = outcome.posteriors_flagged,
    "season synced"
  );
  Ok(outcome)
}

/// Fetch and archive one page of fixtures.
async fn fixtures_page<Src, B>(
  source: &Src,
  blobs: &B,
  key: SeasonKey,
  since: Option<NaiveDate>,
  cursor: PageCursor,
  now: DateTime<Utc>,
) -> Result<Page<Fixture>>
where
  Src: SportsSource,
  B: BlobSink,
{
  let page = source
    .list_fixtures(key, since, cursor)
    .await
    .map_err(Error::from_source)?;
  archive(blobs, key, PayloadKind::Fixtures, now, &page).await?;
  Ok(page)
}

/// Keep the roster timestamp of a sync whose fixture fetch failed. A store
/// failure here only surfaces when it ends the invocation.
async fn record_teams_only<St: SeasonStore>(
  store: &St,
  key: SeasonKey,
  now: DateTime<Utc>,
) -> Result<()> {
  let write = SeasonWrite::Monotonic(FreshnessUpdate::teams_only(now));
  match store.upsert_season(key, write).await {
    Ok(_) => Ok(()),
    Err(e) if e.kind().is_fatal() => Err(Error::from_store(e)),
    Err(e) => {
      tracing::warn!("could not record roster fetch: {e}");
      Ok(())
    }
  }
}
