//! `bayesball`: keeps league, season and fixture data in sync with
//! api-football and flags seasons whose posteriors need recomputing.
//!
//! Reads `bayesball.toml` (or the path given with `--config`) layered under
//! `BAYESBALL_*` environment variables, e.g.
//!
//! ```text
//! BAYESBALL_API_KEY=... BAYESBALL_MAX_UPDATES=5 bayesball run
//! ```

mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use bayesball_blob::FsBlobSink;
use bayesball_core::{
  season::{Season, SeasonKey},
  store::{PosteriorHandoff, SeasonStore},
};
use bayesball_source::ApiFootballClient;
use bayesball_store_sqlite::SqliteStore;
use bayesball_sync::{DiscoveryReport, SchedulerReport, run_discovery, run_scheduler};
use chrono::{DateTime, SubsecRound, Utc};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::AppConfig;

#[derive(Parser)]
#[command(author, version, about = "Bayesball data sync")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "bayesball.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Refresh the league and season catalog.
  Discover,
  /// Sync the stalest seasons.
  Sync {
    /// Override `max_updates` for this run.
    #[arg(long)]
    max_updates: Option<usize>,
  },
  /// Discover, then sync.
  Run,
  /// List tracked seasons.
  Seasons {
    /// Only seasons waiting for a sync.
    #[arg(long)]
    stale: bool,
    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
  },
  /// Hand-off commands for the posterior job.
  #[command(subcommand)]
  Posteriors(PosteriorsCommand),
}

#[derive(Subcommand)]
enum PosteriorsCommand {
  /// Seasons whose posteriors are out of date.
  Pending {
    #[arg(long)]
    json: bool,
  },
  /// Record a finished posterior computation.
  Ack {
    league_id:   i64,
    season_year: i32,
    /// Newest data the computation covered (RFC 3339). Defaults to now.
    #[arg(long)]
    computed_at: Option<DateTime<Utc>>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("BAYESBALL"))
    .build()
    .context("failed to read config file")?;

  let cfg: AppConfig = settings
    .try_deserialize()
    .context("failed to deserialise configuration")?;

  // Stored timestamps have microsecond precision.
  let now = Utc::now().trunc_subsecs(6);
  let store = open_store(&cfg).await?;

  match cli.command {
    Command::Discover => discover(&source(&cfg)?, &cfg, &store).await.map(drop),
    Command::Sync { max_updates } => {
      sync(&source(&cfg)?, &cfg, &store, max_updates, now).await.map(drop)
    }
    Command::Run => run(&source(&cfg)?, &cfg, &store, now).await.map(drop),
    Command::Seasons { stale, json } => {
      let seasons: Vec<Season> = store
        .list_seasons()
        .await?
        .into_iter()
        .filter(|s| !stale || s.data_need_to_update)
        .collect();
      print_seasons(&seasons, json)
    }
    Command::Posteriors(PosteriorsCommand::Pending { json }) => {
      print_seasons(&store.seasons_awaiting_posteriors().await?, json)
    }
    Command::Posteriors(PosteriorsCommand::Ack { league_id, season_year, computed_at }) => {
      let key = SeasonKey::new(league_id, season_year);
      let computed_at = computed_at.unwrap_or(now).trunc_subsecs(6);
      let Some(season) = store.record_posteriors(key, computed_at).await? else {
        bail!("unknown season {key}");
      };
      if season.posteriors_need_to_update {
        println!("{key}: newer results arrived, posteriors still pending");
      } else {
        println!("{key}: posteriors up to date");
      }
      Ok(())
    }
  }
}

async fn open_store(cfg: &AppConfig) -> anyhow::Result<SqliteStore> {
  let path = expand_tilde(&cfg.store_path);
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

fn source(cfg: &AppConfig) -> anyhow::Result<ApiFootballClient> {
  if cfg.api_key.is_empty() {
    bail!("no API key configured (set api_key or BAYESBALL_API_KEY)");
  }
  ApiFootballClient::new(cfg.source()).context("failed to build HTTP client")
}

async fn discover(
  source: &ApiFootballClient,
  cfg: &AppConfig,
  store: &SqliteStore,
) -> anyhow::Result<DiscoveryReport> {
  let report = run_discovery(source, store, &cfg.discovery())
    .await
    .context("season discovery failed")?;
  println!(
    "leagues: {} seen, {} written, {} cups skipped; seasons: {} new, {} updated, {} unchanged, {} failed, {} filtered",
    report.leagues_seen,
    report.leagues_written,
    report.cups_skipped,
    report.seasons_inserted,
    report.seasons_updated,
    report.seasons_unchanged,
    report.seasons_failed,
    report.seasons_filtered,
  );
  Ok(report)
}

async fn sync(
  source: &ApiFootballClient,
  cfg: &AppConfig,
  store: &SqliteStore,
  max_updates: Option<usize>,
  now: DateTime<Utc>,
) -> anyhow::Result<SchedulerReport> {
  let blobs = FsBlobSink::new(expand_tilde(&cfg.blob_dir));
  let mut scheduler = cfg.scheduler()?;
  if let Some(max) = max_updates {
    scheduler.max_updates = max;
  }

  let report = run_scheduler(source, store, &blobs, &scheduler, now)
    .await
    .context("scheduler run failed")?;

  println!(
    "run {}: {} marked stale, {} selected, {} synced, {} failed, {} skipped{}",
    report.run_id,
    report.marked,
    report.selected.len(),
    report.synced.len(),
    report.failed.len(),
    report.skipped.len(),
    report
      .stopped
      .map(|r| format!(" (stopped: {r:?})"))
      .unwrap_or_default(),
  );
  tracing::debug!(calls = source.calls_made().await, "api calls used");
  Ok(report)
}

/// Discovery then a scheduler pass, sharing one client so the call spacing
/// and the per-run cap cover the whole invocation.
async fn run(
  source: &ApiFootballClient,
  cfg: &AppConfig,
  store: &SqliteStore,
  now: DateTime<Utc>,
) -> anyhow::Result<SchedulerReport> {
  discover(source, cfg, store).await?;
  sync(source, cfg, store, None, now).await
}

fn print_seasons(seasons: &[Season], json: bool) -> anyhow::Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(seasons)?);
    return Ok(());
  }
  for s in seasons {
    println!(
      "{:<12} {} .. {}  {:<5}  fixtures {}  posteriors {}{}",
      s.key.to_string(),
      s.meta.start_date,
      s.meta.end_date,
      format!("{:?}", s.freshness()).to_lowercase(),
      s.last_updated_fixtures.format("%Y-%m-%d %H:%M"),
      s.last_updated_posteriors.format("%Y-%m-%d %H:%M"),
      if s.posteriors_need_to_update { "  (pending)" } else { "" },
    );
  }
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use bayesball_sync::StopReason;
  use chrono::TimeZone;
  use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
  };

  use super::*;

  const LEAGUES: &str = r#"{
    "errors": [],
    "paging": {"current": 1, "total": 1},
    "response": [{
      "league": {"id": 39, "name": "Premier League", "type": "League", "logo": null},
      "country": {"name": "England", "code": "GB", "flag": null},
      "seasons": [{
        "year": 2024, "start": "2024-08-16", "end": "2025-05-25", "current": true,
        "coverage": {"fixtures": {"events": true}}
      }]
    }]
  }"#;

  /// Answers up to `max` requests with `body` and returns the request lines.
  async fn serve(body: &'static str, max: usize) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
      let mut seen = Vec::new();
      while seen.len() < max {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut chunk = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
          let n = sock.read(&mut chunk).await.unwrap();
          if n == 0 {
            break;
          }
          head.extend_from_slice(&chunk[..n]);
        }
        let head = String::from_utf8_lossy(&head);
        seen.push(head.lines().next().unwrap_or_default().to_owned());
        let reply = format!(
          "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
          body.len()
        );
        sock.write_all(reply.as_bytes()).await.unwrap();
        sock.shutdown().await.unwrap();
      }
      seen
    });
    (base, handle)
  }

  #[tokio::test]
  async fn run_shares_the_call_cap_between_jobs() {
    let (base, server) = serve(LEAGUES, 1).await;
    let blob_dir = tempfile::tempdir().unwrap();
    let cfg = AppConfig {
      api_key: "key".into(),
      api_base_url: base,
      sleep_time_between_calls_seconds: 0,
      max_calls_per_run: Some(1),
      blob_dir: blob_dir.path().to_path_buf(),
      ..AppConfig::default()
    };
    let store = SqliteStore::open_in_memory().await.unwrap();
    let client = source(&cfg).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 9, 10, 12, 0, 0).unwrap();

    let report = run(&client, &cfg, &store, now).await.unwrap();

    // Discovery spent the only call, so the first roster fetch is refused.
    assert_eq!(report.selected, vec![SeasonKey::new(39, 2024)]);
    assert_eq!(report.failed, vec![SeasonKey::new(39, 2024)]);
    assert_eq!(report.stopped, Some(StopReason::RateLimited));
    assert_eq!(client.calls_made().await, 1);
    let requests = server.await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("GET /leagues"), "{requests:?}");

    let season = store.get_season(SeasonKey::new(39, 2024)).await.unwrap().unwrap();
    assert!(season.data_need_to_update);
  }
}
