//! Filesystem blob sink.
//!
//! A blob lives at `<root>/<key path>`. It is first written to a temporary
//! file in the same directory and then hard-linked into place; linking fails
//! if the target exists, so a published blob is never replaced and readers
//! never observe a partial file.

use std::{
  io::ErrorKind as IoErrorKind,
  path::{Path, PathBuf},
  sync::atomic::{AtomicU64, Ordering},
};

use bayesball_core::blob::{BlobKey, BlobSink, PutOutcome};
use bytes::Bytes;

use crate::{Error, Result, digest};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FsBlobSink {
  root: PathBuf,
}

impl FsBlobSink {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  /// Absolute location of `key` under the root.
  pub fn path_of(&self, key: &BlobKey) -> PathBuf {
    key.path().split('/').fold(self.root.clone(), |p, part| p.join(part))
  }

  async fn compare_existing(&self, key: &BlobKey, path: &Path, incoming: String) -> Result<PutOutcome> {
    let existing = tokio::fs::read(path).await.map_err(Error::io(path))?;
    let stored = digest(&existing);
    if stored == incoming {
      tracing::debug!(blob = %key, "blob already present");
      Ok(PutOutcome::AlreadyPresent { digest: stored })
    } else {
      Err(Error::Conflict { key: key.path(), stored, incoming })
    }
  }
}

impl BlobSink for FsBlobSink {
  type Error = Error;

  async fn put_immutable(&self, key: &BlobKey, payload: Bytes) -> Result<PutOutcome> {
    let path = self.path_of(key);
    let incoming = digest(&payload);

    if tokio::fs::try_exists(&path).await.map_err(Error::io(&path))? {
      return self.compare_existing(key, &path, incoming).await;
    }

    let dir = path.parent().unwrap_or(&self.root).to_path_buf();
    tokio::fs::create_dir_all(&dir).await.map_err(Error::io(&dir))?;

    let tmp = dir.join(format!(
      ".{}.{}.{}.tmp",
      &incoming[..16],
      std::process::id(),
      TMP_COUNTER.fetch_add(1, Ordering::Relaxed),
    ));
    tokio::fs::write(&tmp, &payload).await.map_err(Error::io(&tmp))?;

    let linked = tokio::fs::hard_link(&tmp, &path).await;
    // The temporary name is private to this call either way.
    if let Err(e) = tokio::fs::remove_file(&tmp).await {
      tracing::warn!(path = %tmp.display(), "failed to remove temporary blob: {e}");
    }

    match linked {
      Ok(()) => {
        tracing::debug!(blob = %key, bytes = payload.len(), "blob written");
        Ok(PutOutcome::Written { digest: incoming })
      }
      // Lost a race with another writer of the same key.
      Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
        self.compare_existing(key, &path, incoming).await
      }
      Err(e) => Err(Error::Io { path, source: e }),
    }
  }
}
