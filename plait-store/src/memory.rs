//! In-memory block storage backend.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use plait_model::crypto;
use plait_model::types::Multihash;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::BlockStore;

/// In-memory block store backed by a `RwLock<HashMap>`.
///
/// The reference backend for tests and single-process replicas. Because keys
/// are content addresses, `put` is naturally idempotent.
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<Multihash, Bytes>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite the bytes stored at `hash`, bypassing content addressing.
    /// Test-only hook for corrupting blocks.
    #[doc(hidden)]
    pub fn tamper(&self, hash: &Multihash, data: Bytes) {
        self.blocks
            .write()
            .expect("lock poisoned")
            .insert(*hash, data);
    }
}

#[async_trait::async_trait]
impl BlockStore for MemoryBlockStore {
    async fn put(&self, data: Bytes) -> Result<Multihash, StoreError> {
        let hash = crypto::content_multihash(&data);
        let mut map = self.blocks.write().expect("lock poisoned");
        debug!(%hash, size = data.len(), "storing block in memory");
        map.insert(hash, data);
        Ok(hash)
    }

    async fn get(&self, hash: &Multihash) -> Result<Bytes, StoreError> {
        let map = self.blocks.read().expect("lock poisoned");
        map.get(hash).cloned().ok_or(StoreError::NotFound(*hash))
    }

    async fn contains(&self, hash: &Multihash) -> Result<bool, StoreError> {
        let map = self.blocks.read().expect("lock poisoned");
        Ok(map.contains_key(hash))
    }
}
