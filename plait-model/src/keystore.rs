//! Keystore: named signing keys behind an object-safe trait.
//!
//! The signature scheme is pluggable per log — everything above this trait
//! only sees `PubKey`/`Signature` bytes. The shipped implementation is
//! Ed25519 and keeps decoded signing keys in a bounded LRU so hot signers
//! are not re-derived on every entry.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use zeroize::Zeroizing;

use crate::crypto;
use crate::types::{PubKey, Signature};

/// Decoded-key cache capacity.
const KEY_CACHE_SIZE: usize = 128;

/// Keystore operation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeystoreError {
    #[error("no key named {0:?} in keystore")]
    KeyNotFound(String),
}

/// Named signing keys: create, look up, sign.
///
/// Implementations guard their own state (the trait is `&self` throughout)
/// and must be safe to share across tasks.
pub trait Keystore: Send + Sync {
    /// Ensure a key named `name` exists and return its public half.
    /// Creating an existing key is a no-op returning the existing public key.
    fn create_key(&self, name: &str) -> Result<PubKey, KeystoreError>;

    /// Public half of the key named `name`, if present.
    fn public_key(&self, name: &str) -> Result<Option<PubKey>, KeystoreError>;

    /// Sign `message` with the key named `name`.
    fn sign(&self, name: &str, message: &[u8]) -> Result<Signature, KeystoreError>;
}

/// In-memory keystore.
///
/// Key seeds live in a mutexed map; decoded `SigningKey`s are cached in a
/// bounded LRU. In seeded mode every key is derived from
/// `blake3(seed || name)` so fixtures are reproducible across runs.
pub struct MemoryKeystore {
    seeds: Mutex<HashMap<String, Zeroizing<[u8; 32]>>>,
    cache: Mutex<LruCache<String, ed25519_dalek::SigningKey>>,
    derivation_seed: Option<[u8; 32]>,
}

impl MemoryKeystore {
    /// Keystore generating random keys.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Keystore deriving every key deterministically from `seed`.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::build(Some(seed))
    }

    fn build(derivation_seed: Option<[u8; 32]>) -> Self {
        let cap = NonZeroUsize::new(KEY_CACHE_SIZE).expect("nonzero cache size");
        Self {
            seeds: Mutex::new(HashMap::new()),
            cache: Mutex::new(LruCache::new(cap)),
            derivation_seed,
        }
    }

    fn new_seed(&self, name: &str) -> Zeroizing<[u8; 32]> {
        match self.derivation_seed {
            Some(seed) => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(&seed);
                hasher.update(name.as_bytes());
                Zeroizing::new(*hasher.finalize().as_bytes())
            }
            None => {
                use rand::RngCore;
                let mut seed = Zeroizing::new([0u8; 32]);
                rand::rngs::OsRng.fill_bytes(&mut *seed);
                seed
            }
        }
    }

    fn signing_key(&self, name: &str) -> Result<ed25519_dalek::SigningKey, KeystoreError> {
        let mut cache = self.cache.lock().expect("lock poisoned");
        if let Some(key) = cache.get(name) {
            return Ok(key.clone());
        }
        drop(cache);

        let seeds = self.seeds.lock().expect("lock poisoned");
        let seed = seeds
            .get(name)
            .ok_or_else(|| KeystoreError::KeyNotFound(name.to_string()))?;
        let key = ed25519_dalek::SigningKey::from_bytes(seed);
        drop(seeds);

        self.cache
            .lock()
            .expect("lock poisoned")
            .put(name.to_string(), key.clone());
        Ok(key)
    }
}

impl Default for MemoryKeystore {
    fn default() -> Self {
        Self::new()
    }
}

impl Keystore for MemoryKeystore {
    fn create_key(&self, name: &str) -> Result<PubKey, KeystoreError> {
        let mut seeds = self.seeds.lock().expect("lock poisoned");
        let seed = seeds
            .entry(name.to_string())
            .or_insert_with(|| self.new_seed(name));
        let key = ed25519_dalek::SigningKey::from_bytes(seed);
        Ok(PubKey(key.verifying_key().to_bytes()))
    }

    fn public_key(&self, name: &str) -> Result<Option<PubKey>, KeystoreError> {
        let seeds = self.seeds.lock().expect("lock poisoned");
        Ok(seeds.get(name).map(|seed| {
            let key = ed25519_dalek::SigningKey::from_bytes(seed);
            PubKey(key.verifying_key().to_bytes())
        }))
    }

    fn sign(&self, name: &str, message: &[u8]) -> Result<Signature, KeystoreError> {
        let key = self.signing_key(name)?;
        Ok(crypto::sign(&key, message))
    }
}
