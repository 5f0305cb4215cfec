//! Error type for `bayesball-blob`.

use std::path::PathBuf;

use bayesball_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("blob {key} already holds different content (stored {stored}, incoming {incoming})")]
  Conflict {
    key:      String,
    stored:   String,
    incoming: String,
  },

  #[error("i/o error at {}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Error::Io { path, source }
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Conflict { .. } => ErrorKind::WriteConflict,
      // An archive that cannot be written fails every season the same way.
      Error::Io { .. } => ErrorKind::StoreUnavailable,
    }
  }
}
