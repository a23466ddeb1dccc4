//! Plait Model
//!
//! Pure data types for the plait replicated log: strong byte newtypes,
//! Lamport clocks, identities and their keystore, and the signed
//! content-addressed Entry with its canonical CBOR codec. No storage or
//! network dependencies live here.

pub mod clock;
pub mod codec;
pub mod crypto;
pub mod entry;
pub mod identity;
pub mod keystore;
pub mod types;

pub use clock::LamportClock;
pub use codec::{DecodeError, EncodeError, HeadList};
pub use entry::{Entry, EntryError, ENTRY_VERSION};
pub use identity::{Identity, IdentityError, IdentitySignatures, OwnedIdentity};
pub use keystore::{Keystore, KeystoreError, MemoryKeystore};
pub use types::{Multihash, MultihashError, PubKey, Signature};
