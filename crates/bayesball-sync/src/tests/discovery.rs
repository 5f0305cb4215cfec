use bayesball_core::{
  Classify as _, ErrorKind,
  league::{CatalogEntry, CatalogSeason, Country, League, LeagueKind},
  season::{FreshnessUpdate, SeasonKey, SeasonMeta},
  store::{SeasonStore, SeasonWrite},
};

use super::*;
use crate::{DiscoveryConfig, run_discovery};

fn league(id: i64, name: &str, kind: LeagueKind) -> League {
  League {
    league_id: id,
    name: name.into(),
    kind,
    logo: None,
    country: Country { name: "England".into(), code: Some("GB".into()), flag: None },
  }
}

fn season(year: i32, covered: bool) -> CatalogSeason {
  CatalogSeason {
    year,
    meta: SeasonMeta::new(date(year, 8, 1), date(year + 1, 5, 31), false).unwrap(),
    covers_fixture_events: covered,
  }
}

fn catalog() -> Vec<CatalogEntry> {
  vec![
    CatalogEntry {
      league:  league(39, "Premier League", LeagueKind::League),
      seasons: vec![season(2018, true), season(2019, true), season(2020, true), season(2024, true)],
    },
    CatalogEntry {
      league:  league(45, "FA Cup", LeagueKind::Cup),
      seasons: vec![season(2024, true)],
    },
    CatalogEntry {
      league:  league(40, "Championship", LeagueKind::League),
      seasons: vec![season(2023, false), season(2024, true)],
    },
  ]
}

#[tokio::test]
async fn filters_cups_old_and_uncovered_seasons() {
  let s = store().await;
  let source = FakeSource::new().with_catalog(catalog());

  let report = run_discovery(&source, &s, &DiscoveryConfig::default()).await.unwrap();

  assert_eq!(report.leagues_seen, 3);
  assert_eq!(report.cups_skipped, 1);
  assert_eq!(report.leagues_written, 2);
  // 2018 and 2019 are too old, Championship 2023 has no event coverage.
  assert_eq!(report.seasons_filtered, 3);
  assert_eq!(report.seasons_inserted, 3);

  let keys: Vec<_> = s.list_seasons().await.unwrap().iter().map(|s| s.key).collect();
  assert_eq!(
    keys,
    vec![SeasonKey::new(39, 2020), SeasonKey::new(39, 2024), SeasonKey::new(40, 2024)]
  );

  let leagues: Vec<_> = s.list_leagues().await.unwrap().into_iter().map(|l| l.league_id).collect();
  assert_eq!(leagues, vec![39, 40]);
}

#[tokio::test]
async fn later_duplicate_season_wins() {
  let s = store().await;
  let mut revised = season(2024, true);
  revised.meta = SeasonMeta::new(date(2024, 8, 16), date(2025, 5, 25), true).unwrap();

  let source = FakeSource::new().with_catalog(vec![
    CatalogEntry {
      league:  league(39, "Premier League", LeagueKind::League),
      seasons: vec![season(2024, true)],
    },
    CatalogEntry {
      league:  league(39, "Premier League", LeagueKind::League),
      seasons: vec![revised.clone()],
    },
  ]);

  let report = run_discovery(&source, &s, &DiscoveryConfig::default()).await.unwrap();
  assert_eq!(report.seasons_inserted, 1);

  let stored = s.get_season(SeasonKey::new(39, 2024)).await.unwrap().unwrap();
  assert_eq!(stored.meta, revised.meta);
}

#[tokio::test]
async fn second_run_changes_nothing() {
  let s = store().await;
  let source = FakeSource::new().with_catalog(catalog());
  let cfg = DiscoveryConfig::default();

  run_discovery(&source, &s, &cfg).await.unwrap();
  let before = s.list_seasons().await.unwrap();
  let leagues_before = s.list_leagues().await.unwrap();

  let report = run_discovery(&source, &s, &cfg).await.unwrap();
  assert_eq!(report.seasons_inserted, 0);
  assert_eq!(report.seasons_updated, 0);
  assert_eq!(report.seasons_unchanged, 3);
  assert_eq!(report.leagues_written, 0);

  assert_eq!(s.list_seasons().await.unwrap(), before);
  assert_eq!(s.list_leagues().await.unwrap(), leagues_before);
}

#[tokio::test]
async fn rediscovery_updates_static_fields_only() {
  let s = store().await;
  let key = SeasonKey::new(39, 2024);
  run_discovery(&FakeSource::new().with_catalog(catalog()), &s, &DiscoveryConfig::default())
    .await
    .unwrap();

  s.upsert_season(
    key,
    SeasonWrite::Monotonic(FreshnessUpdate {
      fixtures_at: Some(day(6)),
      newest_finished_at: Some(day(5)),
      data_current: true,
      ..Default::default()
    }),
  )
  .await
  .unwrap();
  let synced = s.get_season(key).await.unwrap().unwrap();

  let mut changed = catalog();
  changed[0].seasons[3].meta = SeasonMeta::new(date(2024, 8, 16), date(2025, 5, 25), true).unwrap();
  let report = run_discovery(&FakeSource::new().with_catalog(changed), &s, &DiscoveryConfig::default())
    .await
    .unwrap();
  assert_eq!(report.seasons_updated, 1);

  let after = s.get_season(key).await.unwrap().unwrap();
  assert_eq!(after.meta.end_date, date(2025, 5, 25));
  assert!(after.meta.current);
  assert_eq!(after.last_updated_fixtures, synced.last_updated_fixtures);
  assert_eq!(after.newest_finished_at, synced.newest_finished_at);
  assert_eq!(after.data_need_to_update, synced.data_need_to_update);
  assert_eq!(after.posteriors_need_to_update, synced.posteriors_need_to_update);
  assert_eq!(after.discovered_at, synced.discovered_at);
}

#[tokio::test]
async fn insert_only_mode_leaves_existing_seasons_alone() {
  let s = store().await;
  let cfg = DiscoveryConfig { merge_static_metadata: false, ..DiscoveryConfig::default() };
  run_discovery(&FakeSource::new().with_catalog(catalog()), &s, &cfg).await.unwrap();

  let mut changed = catalog();
  changed[0].seasons[3].meta = SeasonMeta::new(date(2024, 8, 16), date(2025, 5, 25), true).unwrap();
  let report = run_discovery(&FakeSource::new().with_catalog(changed), &s, &cfg).await.unwrap();

  assert_eq!(report.seasons_inserted, 0);
  assert_eq!(report.seasons_unchanged, 3);
  assert_eq!(report.seasons_failed, 0);
  let stored = s.get_season(SeasonKey::new(39, 2024)).await.unwrap().unwrap();
  assert_eq!(stored.meta.end_date, date(2025, 5, 31));
}

#[tokio::test]
async fn unreachable_catalog_writes_nothing() {
  let s = store().await;
  let source = FakeSource::new()
    .with_catalog(catalog())
    .failing(None, Endpoint::Catalog, ErrorKind::SourceUnavailable);

  let err = run_discovery(&source, &s, &DiscoveryConfig::default()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
  assert!(s.list_seasons().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_season_write_is_counted_and_skipped() {
  let s = FlakyStore::new()
    .await
    .failing(SeasonKey::new(39, 2024), ErrorKind::Invalid);
  let source = FakeSource::new().with_catalog(catalog());

  let report = run_discovery(&source, &s, &DiscoveryConfig::default()).await.unwrap();
  assert_eq!(report.seasons_failed, 1);
  assert_eq!(report.seasons_inserted, 2);

  let keys: Vec<_> = s.inner().list_seasons().await.unwrap().iter().map(|s| s.key).collect();
  assert_eq!(keys, vec![SeasonKey::new(39, 2020), SeasonKey::new(40, 2024)]);
}

#[tokio::test]
async fn unavailable_store_ends_discovery() {
  let s = FlakyStore::new()
    .await
    .failing(SeasonKey::new(39, 2020), ErrorKind::StoreUnavailable);
  let source = FakeSource::new().with_catalog(catalog());

  let err = run_discovery(&source, &s, &DiscoveryConfig::default()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
  // Seasons are written in key order; nothing after the failure is written.
  assert!(s.inner().list_seasons().await.unwrap().is_empty());
}
