//! Error types for `bayesball-core`, plus the taxonomy every backend error
//! maps onto.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("season window ends ({end}) before it starts ({start})")]
  InvalidSeasonWindow { start: NaiveDate, end: NaiveDate },

  #[error("unknown league kind: {0:?}")]
  UnknownLeagueKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Taxonomy ────────────────────────────────────────────────────────────────

/// How the sync jobs react to a failure, independent of which backend raised
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The upstream API could not be reached or answered with an error.
  /// Retried implicitly on the next scheduled run.
  SourceUnavailable,
  /// The upstream API (or the local call cap) refused further calls. The
  /// current batch stops; finished seasons keep their progress.
  RateLimited,
  /// A conditional write lost a race or found the row already present.
  /// Safe to ignore: all season writes are monotonic.
  StoreConflict,
  /// The record store cannot serve requests. Ends the current invocation.
  StoreUnavailable,
  /// A blob key already holds different bytes.
  WriteConflict,
  /// Malformed data or any other non-retriable failure scoped to one item.
  Invalid,
}

impl ErrorKind {
  /// Whether the failure should end the whole invocation rather than just
  /// the item being processed.
  pub fn is_fatal(self) -> bool { matches!(self, Self::StoreUnavailable) }
}

/// Implemented by every backend error so the jobs can decide what to do
/// without knowing the concrete backend.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind { ErrorKind::Invalid }
}
