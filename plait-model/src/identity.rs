//! Identities: who signs entries, and the proof the keystore controls them.
//!
//! An identity carries two keypairs' worth of evidence. The *root* key is
//! named by the caller-supplied id string and never signs entries; its public
//! key (hex) becomes `identity.id`. The *signing* key is named by that hex
//! string and signs every entry. Two signatures tie them together:
//!
//! - `signatures.id`: the signing key over the id string — "this signer
//!   answers for this id".
//! - `signatures.public_key`: the root key over `public_key || signatures.id`
//!   — "this id vouches for this signer".
//!
//! Verification checks both links, so a forged entry needs both private keys.

use std::sync::Arc;

use crate::crypto;
use crate::keystore::{Keystore, KeystoreError};
use crate::types::{PubKey, Signature};

/// Certification-chain signatures (see module docs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySignatures {
    pub id: Signature,
    pub public_key: Signature,
}

/// The public materials of an identity, as embedded in every entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Hex of the root public key.
    pub id: String,
    /// The entry-signing public key.
    pub public_key: PubKey,
    /// Proof chain binding `id` to `public_key`.
    pub signatures: IdentitySignatures,
}

impl Identity {
    /// Validate the certification chain.
    pub fn verify(&self) -> Result<(), IdentityError> {
        crypto::verify_strict(&self.public_key, &self.signatures.id, self.id.as_bytes())
            .map_err(|_| IdentityError::ChainInvalid("id signature"))?;

        let root = PubKey::from_hex(&self.id)
            .map_err(|_| IdentityError::ChainInvalid("id is not a public key"))?;
        let mut message = Vec::with_capacity(32 + 64);
        message.extend_from_slice(self.public_key.as_bytes());
        message.extend_from_slice(&self.signatures.id.0);
        crypto::verify_strict(&root, &self.signatures.public_key, &message)
            .map_err(|_| IdentityError::ChainInvalid("public key signature"))?;

        Ok(())
    }
}

/// An identity together with the keystore holding its private halves.
///
/// This is the local, signing-capable side; the embedded [`Identity`] is what
/// travels inside entries.
#[derive(Clone)]
pub struct OwnedIdentity {
    identity: Identity,
    keystore: Arc<dyn Keystore>,
}

impl OwnedIdentity {
    /// Create (or reopen) the identity named `id` in `keystore`.
    pub fn create(keystore: Arc<dyn Keystore>, id: &str) -> Result<Self, IdentityError> {
        let root_pub = keystore.create_key(id)?;
        let id_string = format!("{}", root_pub);

        let signing_pub = keystore.create_key(&id_string)?;
        let id_signature = keystore.sign(&id_string, id_string.as_bytes())?;

        let mut message = Vec::with_capacity(32 + 64);
        message.extend_from_slice(signing_pub.as_bytes());
        message.extend_from_slice(&id_signature.0);
        let public_key_signature = keystore.sign(id, &message)?;

        Ok(Self {
            identity: Identity {
                id: id_string,
                public_key: signing_pub,
                signatures: IdentitySignatures {
                    id: id_signature,
                    public_key: public_key_signature,
                },
            },
            keystore,
        })
    }

    /// The public identity embedded in entries.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The entry-signing public key.
    pub fn public_key(&self) -> PubKey {
        self.identity.public_key
    }

    /// Sign a message with the identity's signing key.
    pub fn sign(&self, message: &[u8]) -> Result<Signature, IdentityError> {
        Ok(self.keystore.sign(&self.identity.id, message)?)
    }
}

impl std::fmt::Debug for OwnedIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedIdentity")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Identity creation or verification error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("identity chain invalid: {0}")]
    ChainInvalid(&'static str),

    #[error(transparent)]
    Keystore(#[from] KeystoreError),
}
