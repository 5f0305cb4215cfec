//! Write-once payload archive for the Bayesball data sync.
//!
//! Two [`BlobSink`](bayesball_core::blob::BlobSink) implementations:
//! [`FsBlobSink`] lays blobs out under a root directory, [`MemoryBlobSink`]
//! keeps them in a map for tests and dry runs.

mod fs;
mod memory;

pub mod error;

pub use error::{Error, Result};
pub use fs::FsBlobSink;
pub use memory::MemoryBlobSink;

use sha2::{Digest, Sha256};

/// Hex SHA-256 of a payload.
pub fn digest(payload: &[u8]) -> String { hex::encode(Sha256::digest(payload)) }
