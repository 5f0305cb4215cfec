//! The staleness scheduler: one bounded batch of fixture syncs.

use bayesball_core::{
  Classify as _, ErrorKind,
  blob::BlobSink,
  season::{Season, SeasonKey},
  source::SportsSource,
  store::SeasonStore,
};
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{Error, Result, SchedulerConfig, sync_season};

/// Why a run ended before working through its whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
  /// The wall-clock budget ran out.
  Budget,
  /// The source refused further calls.
  RateLimited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerReport {
  pub run_id:   Uuid,
  /// Active seasons that went back to stale at the start of the run.
  pub marked:   usize,
  pub selected: Vec<SeasonKey>,
  pub synced:   Vec<SeasonKey>,
  pub failed:   Vec<SeasonKey>,
  /// Selected but never attempted.
  pub skipped:  Vec<SeasonKey>,
  pub stopped:  Option<StopReason>,
}

fn keys(seasons: &[Season]) -> Vec<SeasonKey> { seasons.iter().map(|s| s.key).collect() }

/// Run one scheduler pass at `now`.
///
/// Active seasons not synced within `stale_after` are flagged again, then up
/// to `max_updates` flagged seasons are synced one after another, stalest
/// first. Seasons finished before the budget ran out or the source pushed
/// back keep their progress; the rest stay the stalest candidates for the
/// next run. Only an unavailable store fails the run.
#[tracing::instrument(skip_all, fields(run_id = tracing::field::Empty))]
pub async fn run_scheduler<Src, St, B>(
  source: &Src,
  store: &St,
  blobs: &B,
  cfg: &SchedulerConfig,
  now: DateTime<Utc>,
) -> Result<SchedulerReport>
where
  Src: SportsSource,
  St: SeasonStore,
  B: BlobSink,
{
  let started = Instant::now();
  let run_id = Uuid::new_v4();
  tracing::Span::current().record("run_id", tracing::field::display(run_id));

  let today = now.date_naive();

  let marked = store
    .mark_stale_active_seasons(today, now - cfg.stale_after)
    .await
    .map_err(Error::from_store)?;

  let mut batch = store
    .query_stale_active_seasons(today, cfg.max_updates)
    .await
    .map_err(Error::from_store)?;

  if cfg.backfill_finished_seasons && batch.len() < cfg.max_updates {
    let backfill = store
      .query_backfill_seasons(today, cfg.max_updates - batch.len())
      .await
      .map_err(Error::from_store)?;
    batch.extend(backfill);
  }

  tracing::info!(marked, selected = batch.len(), "scheduler run started");

  let mut report = SchedulerReport {
    run_id,
    marked,
    selected: keys(&batch),
    synced: Vec::new(),
    failed: Vec::new(),
    skipped: Vec::new(),
    stopped: None,
  };

  for (i, season) in batch.iter().enumerate() {
    if let Some(budget) = cfg.run_timeout
      && started.elapsed() >= budget
    {
      tracing::warn!(remaining = batch.len() - i, "run budget exhausted");
      report.stopped = Some(StopReason::Budget);
      report.skipped = keys(&batch[i..]);
      break;
    }

    match sync_season(source, store, blobs, &cfg.fixtures, season, now).await {
      Ok(outcome) => {
        tracing::info!(
          league_id = season.key.league_id,
          season_year = season.key.season_year,
          fixtures = outcome.fixtures,
          data_current = outcome.data_current,
          posteriors_flagged = outcome.posteriors_flagged,
          "season synced"
        );
        report.synced.push(season.key);
      }
      Err(e) if e.kind() == ErrorKind::RateLimited => {
        tracing::warn!(
          league_id = season.key.league_id,
          season_year = season.key.season_year,
          "rate limited, ending batch: {e}"
        );
        report.failed.push(season.key);
        report.skipped = keys(&batch[i + 1..]);
        report.stopped = Some(StopReason::RateLimited);
        break;
      }
      Err(e) if e.kind().is_fatal() => {
        tracing::error!(
          league_id = season.key.league_id,
          season_year = season.key.season_year,
          "ending run: {e}"
        );
        return Err(e);
      }
      Err(e) => {
        tracing::warn!(
          league_id = season.key.league_id,
          season_year = season.key.season_year,
          "season sync failed: {e}"
        );
        report.failed.push(season.key);
      }
    }
  }

  tracing::info!(
    synced = report.synced.len(),
    failed = report.failed.len(),
    skipped = report.skipped.len(),
    "scheduler run finished"
  );
  Ok(report)
}
