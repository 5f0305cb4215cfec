//! Season discovery: mirror the source catalog into league and season
//! records.

use std::collections::BTreeMap;

use bayesball_core::{
  Classify as _, ErrorKind,
  league::{CatalogEntry, League, LeagueKind},
  season::{SeasonKey, SeasonMeta},
  source::SportsSource,
  store::{SeasonStore, SeasonWrite, WriteOutcome},
};

use crate::{DiscoveryConfig, Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
  pub leagues_seen:      usize,
  pub leagues_written:   usize,
  pub leagues_failed:    usize,
  pub cups_skipped:      usize,
  /// Too old, or without fixture-event coverage.
  pub seasons_filtered:  usize,
  pub seasons_inserted:  usize,
  pub seasons_updated:   usize,
  pub seasons_unchanged: usize,
  pub seasons_failed:    usize,
}

/// The part of the catalog worth tracking. Later duplicates of a league or
/// season win.
#[derive(Debug, Default)]
struct Selection {
  leagues: BTreeMap<i64, League>,
  seasons: BTreeMap<SeasonKey, SeasonMeta>,
}

fn select(catalog: Vec<CatalogEntry>, cfg: &DiscoveryConfig, report: &mut DiscoveryReport) -> Selection {
  let mut selection = Selection::default();

  for entry in catalog {
    report.leagues_seen += 1;
    if entry.league.kind == LeagueKind::Cup {
      report.cups_skipped += 1;
      continue;
    }

    let league_id = entry.league.league_id;
    for season in entry.seasons {
      if season.year <= cfg.first_season_year || !season.covers_fixture_events {
        report.seasons_filtered += 1;
        continue;
      }
      selection
        .seasons
        .insert(SeasonKey::new(league_id, season.year), season.meta);
    }
    selection.leagues.insert(league_id, entry.league);
  }

  selection
}

/// Fetch the catalog and upsert every tracked league and season.
///
/// New seasons start out stale and never synced. Existing seasons only ever
/// get their static fields updated (or nothing at all with
/// `merge_static_metadata` off), so re-running against an unchanged catalog
/// writes nothing. A failed upsert is logged and skipped unless the store is
/// unavailable, which ends the run.
#[tracing::instrument(skip_all)]
pub async fn run_discovery<Src, St>(
  source: &Src,
  store: &St,
  cfg: &DiscoveryConfig,
) -> Result<DiscoveryReport>
where
  Src: SportsSource,
  St: SeasonStore,
{
  let catalog = source
    .list_leagues_and_seasons()
    .await
    .map_err(Error::from_source)?;

  let mut report = DiscoveryReport::default();
  let selection = select(catalog, cfg, &mut report);

  for league in selection.leagues.values() {
    match store.upsert_league(league).await {
      Ok(WriteOutcome::Inserted | WriteOutcome::Updated) => report.leagues_written += 1,
      Ok(WriteOutcome::Unchanged | WriteOutcome::Stale) => {}
      Err(e) if e.kind().is_fatal() => return Err(Error::from_store(e)),
      Err(e) => {
        tracing::warn!(league_id = league.league_id, "league upsert failed: {e}");
        report.leagues_failed += 1;
      }
    }
  }

  for (key, meta) in selection.seasons {
    let write = if cfg.merge_static_metadata {
      SeasonWrite::MergeStatic(meta)
    } else {
      SeasonWrite::InsertOnly(meta)
    };

    match store.upsert_season(key, write).await {
      Ok(WriteOutcome::Inserted) => {
        tracing::debug!(league_id = key.league_id, season_year = key.season_year, "season discovered");
        report.seasons_inserted += 1;
      }
      Ok(WriteOutcome::Updated) => report.seasons_updated += 1,
      Ok(WriteOutcome::Unchanged | WriteOutcome::Stale) => report.seasons_unchanged += 1,
      Err(e) if e.kind() == ErrorKind::StoreConflict => report.seasons_unchanged += 1,
      Err(e) if e.kind().is_fatal() => return Err(Error::from_store(e)),
      Err(e) => {
        tracing::warn!(
          league_id = key.league_id,
          season_year = key.season_year,
          "season upsert failed: {e}"
        );
        report.seasons_failed += 1;
      }
    }
  }

  tracing::info!(
    leagues = selection.leagues.len(),
    inserted = report.seasons_inserted,
    updated = report.seasons_updated,
    unchanged = report.seasons_unchanged,
    failed = report.seasons_failed,
    "discovery finished"
  );
  Ok(report)
}
