//! The `SportsSource` trait: the rate-limited, paginated upstream API.
//!
//! Paged endpoints are modelled as an explicit cursor rather than a single
//! blocking call. Callers drain a sequence by following [`Page::next`] until
//! it is `None`; a failed page can be retried from the same cursor.

use std::future::Future;

use bytes::Bytes;
use chrono::NaiveDate;

use crate::{
  Classify,
  fixture::{Fixture, Team},
  league::CatalogEntry,
  season::SeasonKey,
};

/// Position in a paged listing. Pages are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageCursor(pub u32);

impl PageCursor {
  pub const FIRST: Self = Self(1);

  pub fn number(self) -> u32 { self.0 }
}

/// One page of a listing together with the raw response body it was parsed
/// from, so the body can be archived verbatim.
#[derive(Debug, Clone)]
pub struct Page<T> {
  pub cursor: PageCursor,
  pub items:  Vec<T>,
  pub raw:    Bytes,
  /// Cursor of the following page, `None` on the last one.
  pub next:   Option<PageCursor>,
}

/// Abstraction over the third-party sports-data API.
///
/// Every call may fail with an error classified as
/// [`ErrorKind::SourceUnavailable`](crate::ErrorKind::SourceUnavailable) or
/// [`ErrorKind::RateLimited`](crate::ErrorKind::RateLimited). Implementations
/// are responsible for pacing their own calls; callers never fan out.
pub trait SportsSource: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// The full catalog of leagues and their seasons.
  fn list_leagues_and_seasons(
    &self,
  ) -> impl Future<Output = Result<Vec<CatalogEntry>, Self::Error>> + Send + '_;

  /// One page of the roster listing for a season.
  fn list_teams(
    &self,
    key: SeasonKey,
    cursor: PageCursor,
  ) -> impl Future<Output = Result<Page<Team>, Self::Error>> + Send + '_;

  /// One page of the fixture listing for a season. With `since`, only
  /// fixtures on or after that date are returned.
  fn list_fixtures(
    &self,
    key: SeasonKey,
    since: Option<NaiveDate>,
    cursor: PageCursor,
  ) -> impl Future<Output = Result<Page<Fixture>, Self::Error>> + Send + '_;
}
