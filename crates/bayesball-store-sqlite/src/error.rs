//! Error type for `bayesball-store-sqlite`.

use bayesball_core::{Classify, ErrorKind, season::SeasonKey};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] bayesball_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An insert-only write found the season already present.
  #[error("season {0} already exists")]
  AlreadyExists(SeasonKey),

  /// A freshness update targeted a season that was never discovered.
  #[error("season not found: {0}")]
  SeasonNotFound(SeasonKey),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::AlreadyExists(_) => ErrorKind::StoreConflict,
      Error::Database(e) => classify_database(e),
      Error::Core(_) | Error::DateParse(_) | Error::SeasonNotFound(_) => ErrorKind::Invalid,
    }
  }
}

fn classify_database(e: &tokio_rusqlite::Error) -> ErrorKind {
  match e {
    tokio_rusqlite::Error::ConnectionClosed => ErrorKind::StoreUnavailable,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, _)) => {
      match failure.code {
        ErrorCode::ConstraintViolation => ErrorKind::StoreConflict,
        ErrorCode::DatabaseBusy
        | ErrorCode::DatabaseLocked
        | ErrorCode::CannotOpen
        | ErrorCode::SystemIoFailure
        | ErrorCode::DiskFull
        | ErrorCode::ReadOnly
        | ErrorCode::DatabaseCorrupt
        | ErrorCode::NotADatabase => ErrorKind::StoreUnavailable,
        _ => ErrorKind::Invalid,
      }
    }
    _ => ErrorKind::Invalid,
  }
}
