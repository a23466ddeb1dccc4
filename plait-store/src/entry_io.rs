//! EntryStore: the typed adapter between the log and raw block storage.
//!
//! Writes canonical-encode entries and head lists into the block store;
//! reads decode strictly and verify the signature and identity chain before
//! anything reaches the caller. A block that fails any of these checks is
//! reported, never silently returned.

use std::sync::Arc;

use bytes::Bytes;
use plait_model::codec::{self, HeadList};
use plait_model::entry::Entry;
use plait_model::types::Multihash;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::BlockStore;

/// Cheaply clonable handle pairing a block store with the entry codec.
#[derive(Clone)]
pub struct EntryStore {
    inner: Arc<dyn BlockStore>,
}

impl EntryStore {
    pub fn new(store: Arc<dyn BlockStore>) -> Self {
        Self { inner: store }
    }

    /// The underlying block store.
    pub fn blocks(&self) -> &Arc<dyn BlockStore> {
        &self.inner
    }

    /// Canonical-encode and store an entry. Returns the block address, which
    /// always equals `entry.hash()` — a mismatch means the backend is not
    /// content-addressing the bytes it was given.
    pub async fn put_entry(&self, entry: &Entry) -> Result<Multihash, StoreError> {
        let bytes = entry.to_stored_bytes()?;
        let hash = self.inner.put(Bytes::from(bytes)).await?;
        if hash != *entry.hash() {
            return Err(StoreError::HashMismatch {
                expected: *entry.hash(),
                actual: hash,
            });
        }
        debug!(%hash, log_id = entry.log_id(), "stored entry");
        Ok(hash)
    }

    /// Fetch, decode and verify an entry.
    pub async fn get_entry(&self, hash: &Multihash) -> Result<Entry, StoreError> {
        let bytes = self.inner.get(hash).await?;
        let entry = codec::decode_entry(&bytes)?;
        if entry.hash() != hash {
            // decode derives the hash from the raw bytes, so this only
            // triggers when the backend returned foreign bytes for the key
            return Err(StoreError::HashMismatch {
                expected: *hash,
                actual: *entry.hash(),
            });
        }
        entry.verify()?;
        Ok(entry)
    }

    /// Store a serialized head list.
    pub async fn put_head_list(&self, list: &HeadList) -> Result<Multihash, StoreError> {
        let bytes = codec::encode_head_list(list)?;
        let hash = self.inner.put(Bytes::from(bytes)).await?;
        debug!(%hash, log_id = %list.id, heads = list.heads.len(), "stored head list");
        Ok(hash)
    }

    /// Fetch and decode a head list.
    pub async fn get_head_list(&self, hash: &Multihash) -> Result<HeadList, StoreError> {
        let bytes = self.inner.get(hash).await?;
        Ok(codec::decode_head_list(&bytes)?)
    }
}
