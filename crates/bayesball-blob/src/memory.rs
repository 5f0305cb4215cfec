//! In-memory blob sink.

use std::{collections::HashMap, sync::Arc};

use bayesball_core::blob::{BlobKey, BlobSink, PutOutcome};
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::{Error, Result, digest};

/// A [`BlobSink`] holding everything in a shared map. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobSink {
  blobs: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryBlobSink {
  pub fn new() -> Self { Self::default() }

  pub async fn get(&self, key: &BlobKey) -> Option<Bytes> {
    self.blobs.lock().await.get(&key.path()).cloned()
  }

  /// Every stored path, sorted.
  pub async fn paths(&self) -> Vec<String> {
    let mut paths: Vec<_> = self.blobs.lock().await.keys().cloned().collect();
    paths.sort();
    paths
  }

  pub async fn len(&self) -> usize { self.blobs.lock().await.len() }

  pub async fn is_empty(&self) -> bool { self.blobs.lock().await.is_empty() }
}

impl BlobSink for MemoryBlobSink {
  type Error = Error;

  async fn put_immutable(&self, key: &BlobKey, payload: Bytes) -> Result<PutOutcome> {
    let path = key.path();
    let incoming = digest(&payload);
    let mut blobs = self.blobs.lock().await;

    if let Some(existing) = blobs.get(&path) {
      let stored = digest(existing);
      return if stored == incoming {
        Ok(PutOutcome::AlreadyPresent { digest: stored })
      } else {
        Err(Error::Conflict { key: path, stored, incoming })
      };
    }

    blobs.insert(path, payload);
    Ok(PutOutcome::Written { digest: incoming })
  }
}
