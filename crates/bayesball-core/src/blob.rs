//! The `BlobSink` trait: write-once storage for raw fetched payloads.

use std::{fmt, future::Future};

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{Classify, season::SeasonKey};

/// Which listing a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
  Teams,
  Fixtures,
}

impl PayloadKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Teams => "teams",
      Self::Fixtures => "fixtures",
    }
  }
}

/// Identity of one archived response page. The fetch timestamp is part of
/// the key, so every sync writes fresh keys and history is never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey {
  pub season:     SeasonKey,
  pub fetched_at: DateTime<Utc>,
  pub kind:       PayloadKind,
  pub page:       u32,
}

impl BlobKey {
  /// Relative, `/`-separated path of the blob, e.g.
  /// `fixtures/39/2024/20240906T120000.000000Z/page-001.json`.
  pub fn path(&self) -> String {
    format!(
      "{}/{}/{}/{}/page-{:03}.json",
      self.kind.as_str(),
      self.season.league_id,
      self.season.season_year,
      self.fetched_at.format("%Y%m%dT%H%M%S%.6fZ"),
      self.page,
    )
  }
}

impl fmt::Display for BlobKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.path()) }
}

/// What [`BlobSink::put_immutable`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
  /// New blob; carries the hex SHA-256 of the payload.
  Written { digest: String },
  /// The key already held identical bytes.
  AlreadyPresent { digest: String },
}

/// Write-once payload storage.
pub trait BlobSink: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// Store `payload` under `key`. Re-putting identical bytes is a no-op;
  /// different bytes under an existing key fail with
  /// [`ErrorKind::WriteConflict`](crate::ErrorKind::WriteConflict).
  fn put_immutable<'a>(
    &'a self,
    key: &'a BlobKey,
    payload: Bytes,
  ) -> impl Future<Output = Result<PutOutcome, Self::Error>> + Send + 'a;
}
