//! Canonical CBOR encoding for entries and head lists.
//!
//! This is the interoperability boundary: two implementations must produce
//! byte-identical blocks for byte-identical logical entries. The rules are
//! RFC 8949 deterministic encoding — definite-length containers, minimal-form
//! integers, and map keys ordered by bytewise comparison of their encodings
//! (for text keys: shorter first, then lexicographic). Committed entry key
//! order:
//!
//! ```text
//! entry     : v, id, key, sig, hash, next, clock, payload, identity
//! clock     : id, time
//! identity  : id, publicKey, signatures
//! signatures: id, publicKey
//! ```
//!
//! `sig` and `hash` are always present; an absent value encodes as null.
//! Signing covers the bytes with both nulled; the stored block carries `sig`
//! with `hash` still null, and an entry's hash is the content address of
//! exactly those stored bytes.
//!
//! Decoding is strict: indefinite lengths, duplicate, unknown or missing
//! keys, wrong types and trailing bytes are all errors.

use minicbor::data::Type;
use minicbor::{Decoder, Encoder};

use crate::clock::LamportClock;
use crate::crypto;
use crate::entry::Entry;
use crate::identity::{Identity, IdentitySignatures};
use crate::types::{Multihash, PubKey, Signature};

/// Canonicalization failure while producing bytes.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("cbor encode: {0}")]
    Cbor(#[from] minicbor::encode::Error<std::convert::Infallible>),
}

/// Rejected wire bytes.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("cbor decode: {0}")]
    Cbor(#[from] minicbor::decode::Error),
    #[error("indefinite-length CBOR not allowed")]
    IndefiniteLength,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("duplicate field: {0}")]
    DuplicateField(&'static str),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
    #[error("trailing bytes after value")]
    TrailingBytes,
}

/// Borrowed view of the logical entry fields, for encoding before the entry
/// object exists (the signature and hash are derived from these bytes).
pub(crate) struct EntryParts<'a> {
    pub log_id: &'a str,
    pub payload: &'a [u8],
    pub next: &'a [Multihash],
    pub v: u32,
    pub clock: &'a LamportClock,
    pub key: &'a PubKey,
    pub identity: &'a Identity,
    pub sig: Option<&'a Signature>,
}

impl<'a> EntryParts<'a> {
    pub fn of(entry: &'a Entry, sig: Option<&'a Signature>) -> Self {
        Self {
            log_id: entry.log_id(),
            payload: entry.payload(),
            next: entry.next(),
            v: entry.version(),
            clock: entry.clock(),
            key: entry.key(),
            identity: entry.identity(),
            sig,
        }
    }
}

/// Canonical-encode an entry. `sig: None` yields the signing-domain bytes,
/// `sig: Some(..)` the stored-domain bytes. `hash` is always null.
pub(crate) fn encode_entry(parts: &EntryParts<'_>) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);

    enc.map(9)?;

    enc.str("v")?.u32(parts.v)?;
    enc.str("id")?.str(parts.log_id)?;
    enc.str("key")?.bytes(parts.key.as_bytes())?;

    enc.str("sig")?;
    match parts.sig {
        Some(sig) => enc.bytes(&sig.0)?,
        None => enc.null()?,
    };

    enc.str("hash")?.null()?;

    enc.str("next")?.array(parts.next.len() as u64)?;
    for hash in parts.next {
        enc.bytes(hash.as_bytes())?;
    }

    enc.str("clock")?.map(2)?;
    enc.str("id")?.bytes(parts.clock.id.as_bytes())?;
    enc.str("time")?.u64(parts.clock.time)?;

    enc.str("payload")?.bytes(parts.payload)?;

    enc.str("identity")?.map(3)?;
    enc.str("id")?.str(&parts.identity.id)?;
    enc.str("publicKey")?.bytes(parts.identity.public_key.as_bytes())?;
    enc.str("signatures")?.map(2)?;
    enc.str("id")?.bytes(&parts.identity.signatures.id.0)?;
    enc.str("publicKey")?.bytes(&parts.identity.signatures.public_key.0)?;

    Ok(buf)
}

/// Decode a stored entry block. The hash is recomputed from the raw bytes,
/// so it always matches the block-store address of `bytes`.
pub fn decode_entry(bytes: &[u8]) -> Result<Entry, DecodeError> {
    let mut dec = Decoder::new(bytes);
    let len = map_len(&mut dec)?;
    if len != 9 {
        return Err(DecodeError::InvalidField {
            field: "entry",
            reason: format!("expected 9 keys, got {len}"),
        });
    }

    let mut v: Option<u32> = None;
    let mut log_id: Option<String> = None;
    let mut key: Option<PubKey> = None;
    let mut sig: Option<Signature> = None;
    let mut sig_seen = false;
    let mut hash_seen = false;
    let mut next: Option<Vec<Multihash>> = None;
    let mut clock: Option<LamportClock> = None;
    let mut payload: Option<Vec<u8>> = None;
    let mut identity: Option<Identity> = None;

    for _ in 0..len {
        match dec.str()? {
            "v" => {
                no_dup(v.is_some(), "v")?;
                v = Some(dec.u32()?);
            }
            "id" => {
                no_dup(log_id.is_some(), "id")?;
                log_id = Some(dec.str()?.to_string());
            }
            "key" => {
                no_dup(key.is_some(), "key")?;
                key = Some(pubkey_field(&mut dec, "key")?);
            }
            "sig" => {
                no_dup(sig_seen, "sig")?;
                sig_seen = true;
                if dec.datatype()? == Type::Null {
                    dec.null()?;
                    return Err(DecodeError::InvalidField {
                        field: "sig",
                        reason: "stored entry is unsigned".into(),
                    });
                }
                sig = Some(signature_field(&mut dec, "sig")?);
            }
            "hash" => {
                no_dup(hash_seen, "hash")?;
                hash_seen = true;
                if dec.datatype()? != Type::Null {
                    return Err(DecodeError::InvalidField {
                        field: "hash",
                        reason: "must be null in canonical form".into(),
                    });
                }
                dec.null()?;
            }
            "next" => {
                no_dup(next.is_some(), "next")?;
                let count = dec.array()?.ok_or(DecodeError::IndefiniteLength)?;
                let mut hashes = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let raw = dec.bytes()?;
                    hashes.push(Multihash::try_from(raw).map_err(|e| {
                        DecodeError::InvalidField {
                            field: "next",
                            reason: e.to_string(),
                        }
                    })?);
                }
                next = Some(hashes);
            }
            "clock" => {
                no_dup(clock.is_some(), "clock")?;
                clock = Some(decode_clock(&mut dec)?);
            }
            "payload" => {
                no_dup(payload.is_some(), "payload")?;
                payload = Some(dec.bytes()?.to_vec());
            }
            "identity" => {
                no_dup(identity.is_some(), "identity")?;
                identity = Some(decode_identity(&mut dec)?);
            }
            other => return Err(DecodeError::UnknownField(other.to_string())),
        }
    }

    if dec.datatype().is_ok() {
        return Err(DecodeError::TrailingBytes);
    }

    Ok(Entry::from_parts(
        log_id.ok_or(DecodeError::MissingField("id"))?,
        payload.ok_or(DecodeError::MissingField("payload"))?,
        next.ok_or(DecodeError::MissingField("next"))?,
        v.ok_or(DecodeError::MissingField("v"))?,
        clock.ok_or(DecodeError::MissingField("clock"))?,
        key.ok_or(DecodeError::MissingField("key"))?,
        identity.ok_or(DecodeError::MissingField("identity"))?,
        sig.ok_or(DecodeError::MissingField("sig"))?,
        crypto::content_multihash(bytes),
    ))
}

fn decode_clock(dec: &mut Decoder<'_>) -> Result<LamportClock, DecodeError> {
    let len = map_len(dec)?;
    if len != 2 {
        return Err(DecodeError::InvalidField {
            field: "clock",
            reason: format!("expected 2 keys, got {len}"),
        });
    }
    let mut id: Option<PubKey> = None;
    let mut time: Option<u64> = None;
    for _ in 0..len {
        match dec.str()? {
            "id" => {
                no_dup(id.is_some(), "clock.id")?;
                id = Some(pubkey_field(dec, "clock.id")?);
            }
            "time" => {
                no_dup(time.is_some(), "clock.time")?;
                time = Some(dec.u64()?);
            }
            other => return Err(DecodeError::UnknownField(format!("clock.{other}"))),
        }
    }
    Ok(LamportClock::new(
        id.ok_or(DecodeError::MissingField("clock.id"))?,
        time.ok_or(DecodeError::MissingField("clock.time"))?,
    ))
}

fn decode_identity(dec: &mut Decoder<'_>) -> Result<Identity, DecodeError> {
    let len = map_len(dec)?;
    if len != 3 {
        return Err(DecodeError::InvalidField {
            field: "identity",
            reason: format!("expected 3 keys, got {len}"),
        });
    }
    let mut id: Option<String> = None;
    let mut public_key: Option<PubKey> = None;
    let mut signatures: Option<IdentitySignatures> = None;
    for _ in 0..len {
        match dec.str()? {
            "id" => {
                no_dup(id.is_some(), "identity.id")?;
                id = Some(dec.str()?.to_string());
            }
            "publicKey" => {
                no_dup(public_key.is_some(), "identity.publicKey")?;
                public_key = Some(pubkey_field(dec, "identity.publicKey")?);
            }
            "signatures" => {
                no_dup(signatures.is_some(), "identity.signatures")?;
                signatures = Some(decode_signatures(dec)?);
            }
            other => return Err(DecodeError::UnknownField(format!("identity.{other}"))),
        }
    }
    Ok(Identity {
        id: id.ok_or(DecodeError::MissingField("identity.id"))?,
        public_key: public_key.ok_or(DecodeError::MissingField("identity.publicKey"))?,
        signatures: signatures.ok_or(DecodeError::MissingField("identity.signatures"))?,
    })
}

fn decode_signatures(dec: &mut Decoder<'_>) -> Result<IdentitySignatures, DecodeError> {
    let len = map_len(dec)?;
    if len != 2 {
        return Err(DecodeError::InvalidField {
            field: "identity.signatures",
            reason: format!("expected 2 keys, got {len}"),
        });
    }
    let mut id: Option<Signature> = None;
    let mut public_key: Option<Signature> = None;
    for _ in 0..len {
        match dec.str()? {
            "id" => {
                no_dup(id.is_some(), "signatures.id")?;
                id = Some(signature_field(dec, "signatures.id")?);
            }
            "publicKey" => {
                no_dup(public_key.is_some(), "signatures.publicKey")?;
                public_key = Some(signature_field(dec, "signatures.publicKey")?);
            }
            other => return Err(DecodeError::UnknownField(format!("signatures.{other}"))),
        }
    }
    Ok(IdentitySignatures {
        id: id.ok_or(DecodeError::MissingField("signatures.id"))?,
        public_key: public_key.ok_or(DecodeError::MissingField("signatures.publicKey"))?,
    })
}

// ---------------------------------------------------------------------------
// Head lists (log serialization)
// ---------------------------------------------------------------------------

/// The serialized form of a log: its id and head hashes, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadList {
    pub id: String,
    pub heads: Vec<Multihash>,
}

/// Canonical-encode a head list (`{id, heads}`, key order `id, heads`).
pub fn encode_head_list(list: &HeadList) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.map(2)?;
    enc.str("id")?.str(&list.id)?;
    enc.str("heads")?.array(list.heads.len() as u64)?;
    for hash in &list.heads {
        enc.bytes(hash.as_bytes())?;
    }
    Ok(buf)
}

/// Decode a head list block.
pub fn decode_head_list(bytes: &[u8]) -> Result<HeadList, DecodeError> {
    let mut dec = Decoder::new(bytes);
    let len = map_len(&mut dec)?;
    if len != 2 {
        return Err(DecodeError::InvalidField {
            field: "head list",
            reason: format!("expected 2 keys, got {len}"),
        });
    }
    let mut id: Option<String> = None;
    let mut heads: Option<Vec<Multihash>> = None;
    for _ in 0..len {
        match dec.str()? {
            "id" => {
                no_dup(id.is_some(), "id")?;
                id = Some(dec.str()?.to_string());
            }
            "heads" => {
                no_dup(heads.is_some(), "heads")?;
                let count = dec.array()?.ok_or(DecodeError::IndefiniteLength)?;
                let mut hashes = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let raw = dec.bytes()?;
                    hashes.push(Multihash::try_from(raw).map_err(|e| {
                        DecodeError::InvalidField {
                            field: "heads",
                            reason: e.to_string(),
                        }
                    })?);
                }
                heads = Some(hashes);
            }
            other => return Err(DecodeError::UnknownField(other.to_string())),
        }
    }
    if dec.datatype().is_ok() {
        return Err(DecodeError::TrailingBytes);
    }
    Ok(HeadList {
        id: id.ok_or(DecodeError::MissingField("id"))?,
        heads: heads.ok_or(DecodeError::MissingField("heads"))?,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn map_len(dec: &mut Decoder<'_>) -> Result<u64, DecodeError> {
    dec.map()?.ok_or(DecodeError::IndefiniteLength)
}

fn no_dup(seen: bool, field: &'static str) -> Result<(), DecodeError> {
    if seen {
        Err(DecodeError::DuplicateField(field))
    } else {
        Ok(())
    }
}

fn pubkey_field(dec: &mut Decoder<'_>, field: &'static str) -> Result<PubKey, DecodeError> {
    let raw = dec.bytes()?;
    PubKey::try_from(raw).map_err(|_| DecodeError::InvalidField {
        field,
        reason: format!("expected 32 bytes, got {}", raw.len()),
    })
}

fn signature_field(dec: &mut Decoder<'_>, field: &'static str) -> Result<Signature, DecodeError> {
    let raw = dec.bytes()?;
    Signature::try_from(raw).map_err(|_| DecodeError::InvalidField {
        field,
        reason: format!("expected 64 bytes, got {}", raw.len()),
    })
}
