//! Entry: the immutable, signed node of the log DAG.
//!
//! An entry commits to its payload, its parents (`next`), its Lamport clock
//! and its author's identity chain. The signature covers the canonical bytes
//! with `sig`/`hash` nulled; the content hash addresses the canonical bytes
//! with `sig` set. Entries are constructed by [`Entry::create`] or decoded
//! from stored blocks, and never mutated afterwards.

use std::cmp::Ordering;

use crate::clock::LamportClock;
use crate::codec::{self, EncodeError, EntryParts};
use crate::crypto;
use crate::identity::{Identity, IdentityError, OwnedIdentity};
use crate::types::{Multihash, PubKey, Signature};

/// Current entry format version.
pub const ENTRY_VERSION: u32 = 1;

/// Entry construction or verification error.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("entry payload must not be empty")]
    InvalidPayload,

    #[error("signing key missing from keystore")]
    SignerMissing,

    #[error("encode: {0}")]
    Encode(#[from] EncodeError),

    #[error("entry signature invalid")]
    SignatureInvalid,

    #[error("entry identity invalid: {0}")]
    IdentityInvalid(IdentityError),
}

/// A signed, content-addressed node of the log DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    log_id: String,
    payload: Vec<u8>,
    next: Vec<Multihash>,
    v: u32,
    clock: LamportClock,
    key: PubKey,
    identity: Identity,
    sig: Signature,
    hash: Multihash,
}

impl Entry {
    /// Create a signed entry.
    ///
    /// `next` preserves the parent order given here, minus duplicates. When
    /// no clock is supplied, the entry gets `1 + max(parent times)` under the
    /// signer's key.
    pub fn create(
        signer: &OwnedIdentity,
        log_id: &str,
        payload: &[u8],
        parents: &[Entry],
        clock: Option<LamportClock>,
    ) -> Result<Entry, EntryError> {
        if payload.is_empty() {
            return Err(EntryError::InvalidPayload);
        }

        let mut next = Vec::with_capacity(parents.len());
        for parent in parents {
            if !next.contains(&parent.hash) {
                next.push(parent.hash);
            }
        }

        let clock = clock.unwrap_or_else(|| {
            let max_parent = parents.iter().map(|p| p.clock.time).max().unwrap_or(0);
            LamportClock::new(signer.public_key(), max_parent + 1)
        });

        let key = signer.public_key();
        let identity = signer.identity().clone();

        let signing_bytes = codec::encode_entry(&EntryParts {
            log_id,
            payload,
            next: &next,
            v: ENTRY_VERSION,
            clock: &clock,
            key: &key,
            identity: &identity,
            sig: None,
        })?;
        let sig = signer
            .sign(&signing_bytes)
            .map_err(|_| EntryError::SignerMissing)?;

        let stored_bytes = codec::encode_entry(&EntryParts {
            log_id,
            payload,
            next: &next,
            v: ENTRY_VERSION,
            clock: &clock,
            key: &key,
            identity: &identity,
            sig: Some(&sig),
        })?;
        let hash = crypto::content_multihash(&stored_bytes);

        Ok(Entry {
            log_id: log_id.to_string(),
            payload: payload.to_vec(),
            next,
            v: ENTRY_VERSION,
            clock,
            key,
            identity,
            sig,
            hash,
        })
    }

    /// Rebuild an entry from decoded fields. Codec-internal.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        log_id: String,
        payload: Vec<u8>,
        next: Vec<Multihash>,
        v: u32,
        clock: LamportClock,
        key: PubKey,
        identity: Identity,
        sig: Signature,
        hash: Multihash,
    ) -> Entry {
        Entry {
            log_id,
            payload,
            next,
            v,
            clock,
            key,
            identity,
            sig,
            hash,
        }
    }

    /// Check the signature and the identity chain.
    ///
    /// The signature is verified against freshly re-encoded signing-domain
    /// bytes, so any tampered field invalidates it.
    pub fn verify(&self) -> Result<(), EntryError> {
        self.identity
            .verify()
            .map_err(EntryError::IdentityInvalid)?;
        if self.key != self.identity.public_key {
            return Err(EntryError::IdentityInvalid(IdentityError::ChainInvalid(
                "entry key does not match identity",
            )));
        }

        let signing_bytes = codec::encode_entry(&EntryParts::of(self, None))?;
        crypto::verify_strict(&self.key, &self.sig, &signing_bytes)
            .map_err(|_| EntryError::SignatureInvalid)
    }

    /// The canonical stored-domain bytes — what the block store holds.
    pub fn to_stored_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        codec::encode_entry(&EntryParts::of(self, Some(&self.sig)))
    }

    /// `true` when `parent` is named in `child.next`.
    pub fn is_parent(parent: &Entry, child: &Entry) -> bool {
        child.next.contains(&parent.hash)
    }

    /// Lamport-order comparison: `(clock.time, clock.id)`.
    ///
    /// Returns `Equal` only for same author, same tick; the sort driver is
    /// responsible for breaking that tie by hash.
    pub fn compare(&self, other: &Entry) -> Ordering {
        self.clock.cmp(&other.clock)
    }

    // --- accessors ---

    pub fn hash(&self) -> &Multihash {
        &self.hash
    }

    pub fn log_id(&self) -> &str {
        &self.log_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn next(&self) -> &[Multihash] {
        &self.next
    }

    pub fn version(&self) -> u32 {
        self.v
    }

    pub fn clock(&self) -> &LamportClock {
        &self.clock
    }

    pub fn key(&self) -> &PubKey {
        &self.key
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn sig(&self) -> &Signature {
        &self.sig
    }
}
