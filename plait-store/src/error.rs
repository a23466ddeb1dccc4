//! Error types for block storage operations.

use plait_model::entry::EntryError;
use plait_model::types::Multihash;
use plait_model::{DecodeError, EncodeError};

/// Errors that can occur at the block-store boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No block stored under this address.
    #[error("block not found: {0}")]
    NotFound(Multihash),

    /// The backend is temporarily unreachable; retrying may succeed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A block's address does not match its content.
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        expected: Multihash,
        actual: Multihash,
    },

    /// Canonicalization failed while writing.
    #[error("encode: {0}")]
    Encode(#[from] EncodeError),

    /// A stored block is not a canonical entry or head list.
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),

    /// A stored entry failed signature or identity verification.
    #[error("entry invalid: {0}")]
    EntryInvalid(#[from] EntryError),
}

impl StoreError {
    /// Whether a retry of the same operation can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
