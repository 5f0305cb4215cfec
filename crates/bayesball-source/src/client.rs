//! Async HTTP client for the api-football v3 REST API.

use std::time::Duration;

use bayesball_core::{
  fixture::{Fixture, Team},
  league::CatalogEntry,
  season::SeasonKey,
  source::{Page, PageCursor, SportsSource},
};
use bytes::Bytes;
use chrono::{Days, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
  Error, Result, Throttle,
  wire::{Envelope, FixtureEntry, LeagueEntry, TeamEntry, check_errors},
};

pub const DEFAULT_BASE_URL: &str = "https://v3.football.api-sports.io";
pub const DEFAULT_API_HOST: &str = "v3.football.api-sports.io";

/// Connection and pacing settings for the upstream API.
#[derive(Debug, Clone)]
pub struct SourceConfig {
  pub base_url:        String,
  pub api_host:        String,
  pub api_key:         String,
  pub request_timeout: Duration,
  /// Minimum delay between the starts of two consecutive calls.
  pub call_interval:   Duration,
  /// Hard cap on calls made by one client instance.
  pub max_calls:       Option<u32>,
}

impl Default for SourceConfig {
  fn default() -> Self {
    Self {
      base_url:        DEFAULT_BASE_URL.to_owned(),
      api_host:        DEFAULT_API_HOST.to_owned(),
      api_key:         String::new(),
      request_timeout: Duration::from_secs(30),
      call_interval:   Duration::from_secs(5),
      max_calls:       None,
    }
  }
}

/// [`SportsSource`] backed by api-football.
///
/// One instance corresponds to one job run: the call cap counts every
/// request this client has made.
pub struct ApiFootballClient {
  client:   Client,
  config:   SourceConfig,
  throttle: Throttle,
}

impl ApiFootballClient {
  pub fn new(config: SourceConfig) -> Result<Self> {
    let client = Client::builder().timeout(config.request_timeout).build()?;
    let throttle = Throttle::new(config.call_interval, config.max_calls);
    Ok(Self { client, config, throttle })
  }

  /// Requests issued so far, including failed ones.
  pub async fn calls_made(&self) -> u32 { self.throttle.calls_made().await }

  fn url(&self, endpoint: &str) -> String {
    format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
  }

  /// `GET /<endpoint>?<query>`, returning the raw body of a 2xx response.
  async fn get(&self, endpoint: &'static str, query: &[(&str, String)]) -> Result<Bytes> {
    self.throttle.acquire().await?;
    tracing::debug!(endpoint, ?query, "api request");

    let resp = self
      .client
      .get(self.url(endpoint))
      .header("x-rapidapi-host", &self.config.api_host)
      .header("x-rapidapi-key", &self.config.api_key)
      .query(query)
      .send()
      .await?;

    let status = resp.status();
    if let Some(remaining) = resp
      .headers()
      .get("x-ratelimit-requests-remaining")
      .and_then(|v| v.to_str().ok())
    {
      tracing::debug!(endpoint, remaining, "daily quota");
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
      return Err(Error::RateLimited { endpoint, message: status.to_string() });
    }
    if !status.is_success() {
      return Err(Error::Status { endpoint, status });
    }
    Ok(resp.bytes().await?)
  }

  async fn get_envelope<T: DeserializeOwned>(
    &self,
    endpoint: &'static str,
    query: &[(&str, String)],
  ) -> Result<(Envelope<T>, Bytes)> {
    let raw = self.get(endpoint, query).await?;
    let envelope: Envelope<T> = serde_json::from_slice(&raw)?;
    check_errors(endpoint, &envelope.errors)?;
    Ok((envelope, raw))
  }

  async fn get_page<W, T>(
    &self,
    endpoint: &'static str,
    mut query: Vec<(&'static str, String)>,
    cursor: PageCursor,
  ) -> Result<Page<T>>
  where
    W: DeserializeOwned,
    T: From<W>,
  {
    // The first page is the default; only paged follow-ups carry the param.
    if cursor != PageCursor::FIRST {
      query.push(("page", cursor.number().to_string()));
    }

    let (envelope, raw) = self.get_envelope::<W>(endpoint, &query).await?;
    Ok(Page {
      cursor,
      items: envelope.response.into_iter().map(T::from).collect(),
      raw,
      next: envelope.paging.next().map(PageCursor),
    })
  }
}

fn season_query(key: SeasonKey) -> Vec<(&'static str, String)> {
  vec![
    ("league", key.league_id.to_string()),
    ("season", key.season_year.to_string()),
  ]
}

/// The `from`/`to` window for an incremental fixture listing. The API wants
/// both bounds; a year past the newest known result covers any season.
fn since_window(since: NaiveDate) -> [(&'static str, String); 2] {
  let to = since.checked_add_days(Days::new(366)).unwrap_or(NaiveDate::MAX);
  [
    ("from", since.format("%Y-%m-%d").to_string()),
    ("to", to.format("%Y-%m-%d").to_string()),
  ]
}

impl SportsSource for ApiFootballClient {
  type Error = Error;

  async fn list_leagues_and_seasons(&self) -> Result<Vec<CatalogEntry>> {
    let (envelope, _) = self.get_envelope::<LeagueEntry>("leagues", &[]).await?;
    let catalog: Vec<_> = envelope
      .response
      .into_iter()
      .filter_map(LeagueEntry::into_catalog)
      .collect();
    tracing::debug!(leagues = catalog.len(), "catalog fetched");
    Ok(catalog)
  }

  async fn list_teams(&self, key: SeasonKey, cursor: PageCursor) -> Result<Page<Team>> {
    self
      .get_page::<TeamEntry, Team>("teams", season_query(key), cursor)
      .await
  }

  async fn list_fixtures(
    &self,
    key: SeasonKey,
    since: Option<NaiveDate>,
    cursor: PageCursor,
  ) -> Result<Page<Fixture>> {
    let mut query = season_query(key);
    if let Some(since) = since {
      query.extend(since_window(since));
    }
    self
      .get_page::<FixtureEntry, Fixture>("fixtures", query, cursor)
      .await
  }
}

#[cfg(test)]
mod tests {
  use bayesball_core::{Classify as _, ErrorKind};
  use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
  };

  use super::*;

  /// Answers one connection per canned `(status, body)` and returns the
  /// request lines it saw.
  async fn serve(replies: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
      let mut seen = Vec::new();
      for (status, body) in replies {
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
          "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
          body.len()
        );
        sock.write_all(reply.as_bytes()).await.unwrap();
        sock.shutdown().await.unwrap();
      }
      seen
    });
    (base, handle)
  }

  fn local(base: String) -> ApiFootballClient {
    ApiFootballClient::new(SourceConfig {
      base_url: base,
      api_key: "key".into(),
      call_interval: Duration::ZERO,
      ..SourceConfig::default()
    })
    .unwrap()
  }

  fn empty_page(current: u32, total: u32) -> String {
    format!(r#"{{"errors":[],"paging":{{"current":{current},"total":{total}}},"response":[]}}"#)
  }

  #[test]
  fn url_joins_without_double_slash() {
    let client = ApiFootballClient::new(SourceConfig {
      base_url: "http://localhost:8080/".into(),
      ..SourceConfig::default()
    })
    .unwrap();
    assert_eq!(client.url("fixtures"), "http://localhost:8080/fixtures");
  }

  #[test]
  fn since_window_spans_a_year() {
    let since = NaiveDate::from_ymd_opt(2024, 9, 6).unwrap();
    let [from, to] = since_window(since);
    assert_eq!(from, ("from", "2024-09-06".to_owned()));
    assert_eq!(to, ("to", "2025-09-07".to_owned()));
  }

  #[tokio::test]
  async fn call_cap_stops_requests_before_network() {
    let client = ApiFootballClient::new(SourceConfig {
      base_url: "http://127.0.0.1:9".into(),
      call_interval: Duration::ZERO,
      max_calls: Some(0),
      ..SourceConfig::default()
    })
    .unwrap();

    let err = client.list_leagues_and_seasons().await.unwrap_err();
    assert!(matches!(err, Error::CallBudgetExhausted(0)));
    assert_eq!(client.calls_made().await, 0);
  }

  #[tokio::test]
  async fn page_param_sent_only_after_first_page() {
    let (base, server) = serve(vec![(200, empty_page(1, 2)), (200, empty_page(2, 2))]).await;
    let client = local(base);
    let key = SeasonKey::new(39, 2024);

    let first = client.list_fixtures(key, None, PageCursor::FIRST).await.unwrap();
    assert_eq!(first.next, Some(PageCursor(2)));
    let second = client.list_fixtures(key, None, PageCursor(2)).await.unwrap();
    assert_eq!(second.next, None);

    let requests = server.await.unwrap();
    assert_eq!(requests, vec![
      "GET /fixtures?league=39&season=2024 HTTP/1.1".to_owned(),
      "GET /fixtures?league=39&season=2024&page=2 HTTP/1.1".to_owned(),
    ]);
  }

  #[tokio::test]
  async fn too_many_requests_is_rate_limited() {
    let (base, server) = serve(vec![(429, "{}".to_owned())]).await;
    let client = local(base);

    let err = client
      .list_teams(SeasonKey::new(39, 2024), PageCursor::FIRST)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::RateLimited { endpoint: "teams", .. }), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::RateLimited);
    server.await.unwrap();
  }

  #[tokio::test]
  async fn server_error_is_unavailable() {
    let (base, server) = serve(vec![(503, String::new())]).await;
    let err = local(base).list_leagues_and_seasons().await.unwrap_err();
    assert!(matches!(err, Error::Status { status: StatusCode::SERVICE_UNAVAILABLE, .. }));
    assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    server.await.unwrap();
  }
}
