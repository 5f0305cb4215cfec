//! Error type for `bayesball-source`.

use bayesball_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("GET /{endpoint} → {status}")]
  Status {
    endpoint: &'static str,
    status:   reqwest::StatusCode,
  },

  /// The API refused the call because of its own quota.
  #[error("rate limited on /{endpoint}: {message}")]
  RateLimited {
    endpoint: &'static str,
    message:  String,
  },

  /// The local per-run call cap was reached.
  #[error("per-run call budget of {0} exhausted")]
  CallBudgetExhausted(u32),

  #[error("api error on /{endpoint}: {message}")]
  Api {
    endpoint: &'static str,
    message:  String,
  },

  #[error("malformed response: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::RateLimited { .. } | Error::CallBudgetExhausted(_) => ErrorKind::RateLimited,
      Error::Http(_) | Error::Status { .. } | Error::Api { .. } | Error::Json(_) => {
        ErrorKind::SourceUnavailable
      }
    }
  }
}
