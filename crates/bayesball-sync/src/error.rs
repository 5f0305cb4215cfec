//! Error type for `bayesball-sync`.
//!
//! The jobs are generic over their backends, so backend errors are boxed and
//! carried together with the [`ErrorKind`] they were classified as.

use bayesball_core::{Classify, ErrorKind};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("source error: {inner}")]
  Source {
    kind:  ErrorKind,
    #[source]
    inner: BoxError,
  },

  #[error("record store error: {inner}")]
  Store {
    kind:  ErrorKind,
    #[source]
    inner: BoxError,
  },

  #[error("blob sink error: {inner}")]
  Blob {
    kind:  ErrorKind,
    #[source]
    inner: BoxError,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn from_source<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Error::Source { kind: e.kind(), inner: Box::new(e) }
  }

  pub fn from_store<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Error::Store { kind: e.kind(), inner: Box::new(e) }
  }

  pub fn from_blob<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Error::Blob { kind: e.kind(), inner: Box::new(e) }
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Source { kind, .. } | Error::Store { kind, .. } | Error::Blob { kind, .. } => *kind,
    }
  }
}
