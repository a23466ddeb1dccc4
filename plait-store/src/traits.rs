//! Core trait for content-addressed block storage.

use bytes::Bytes;
use plait_model::types::Multihash;

use crate::error::StoreError;

/// A key→bytes store keyed by self-describing content hash.
///
/// All implementations must be `Send + Sync`: the fetcher issues concurrent
/// `get`s and replicas share one store. Data is passed as [`Bytes`] to keep
/// block handoff zero-copy.
#[async_trait::async_trait]
pub trait BlockStore: Send + Sync {
    /// Store a block and return its content address. Idempotent: writing the
    /// same bytes twice returns the same address.
    async fn put(&self, data: Bytes) -> Result<Multihash, StoreError>;

    /// Retrieve a block by address.
    async fn get(&self, hash: &Multihash) -> Result<Bytes, StoreError>;

    /// Check whether a block exists.
    async fn contains(&self, hash: &Multihash) -> Result<bool, StoreError>;
}
