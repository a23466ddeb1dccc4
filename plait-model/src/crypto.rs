//! Centralized cryptographic operations for Plait.
//!
//! **All** Ed25519 signing, verification and BLAKE3 hashing go through this
//! module. This provides a single audit surface for cryptographic
//! correctness.
//!
//! # Primitives
//!
//! | Primitive   | Algorithm       | Purpose                                  |
//! |-------------|-----------------|------------------------------------------|
//! | Hash        | BLAKE3 (32 B)   | Content addressing, DAG linkage          |
//! | Signature   | Ed25519 (64 B)  | Entry signing, identity certification    |

use crate::types::{Multihash, PubKey, Signature};

// ---------------------------------------------------------------------------
// Content hashing (BLAKE3)
// ---------------------------------------------------------------------------

/// Compute the self-describing BLAKE3 content address of arbitrary bytes.
///
/// Used for: entry hashing, head-list blocks, and every block-store key.
#[inline]
pub fn content_multihash(data: &[u8]) -> Multihash {
    Multihash::from_digest(*blake3::hash(data).as_bytes())
}

// ---------------------------------------------------------------------------
// Ed25519 signing
// ---------------------------------------------------------------------------

/// Sign a message with an Ed25519 signing key.
///
/// Entries are signed over their canonical CBOR bytes with the `sig` and
/// `hash` slots nulled, so a signature commits to every logical field.
pub fn sign(signing_key: &ed25519_dalek::SigningKey, message: &[u8]) -> Signature {
    use ed25519_dalek::Signer;
    Signature(signing_key.sign(message).to_bytes())
}

// ---------------------------------------------------------------------------
// Ed25519 verification
// ---------------------------------------------------------------------------

/// Verify an Ed25519 signature over a message (strict).
///
/// Uses `verify_strict()` (rejects small-order keys, checks canonical S).
/// Every stored entry and identity link is checked through this path.
pub fn verify_strict(
    pubkey: &PubKey,
    signature: &Signature,
    message: &[u8],
) -> Result<(), CryptoError> {
    let vk = verifying_key(pubkey)?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify_strict(message, &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Deserialize a `PubKey` into an Ed25519 `VerifyingKey`.
///
/// Fails if the 32 bytes are not a valid curve point.
pub fn verifying_key(pubkey: &PubKey) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
    ed25519_dalek::VerifyingKey::from_bytes(&pubkey.0).map_err(|_| CryptoError::InvalidPublicKey)
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Cryptographic operation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid Ed25519 signature")]
    InvalidSignature,

    #[error("invalid Ed25519 public key")]
    InvalidPublicKey,
}
