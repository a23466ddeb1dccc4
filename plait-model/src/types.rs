//! Strong types for byte arrays
//!
//! Semantic newtypes for the fixed-size byte values that flow through the
//! log: content addresses, public keys and signatures.

use std::fmt;

/// Macro to define fixed-size byte arrays with strong types.
macro_rules! define_bytes {
    ($name:ident, $len:expr, $doc:expr, [$($derives:ident),*]) => {
        #[doc = $doc]
        #[derive(Clone, Copy, $($derives),*)]
        #[repr(transparent)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Returns the inner bytes as a slice.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Parse from a hex string.
            pub fn from_hex(hex_str: &str) -> Result<Self, String> {
                let bytes = hex::decode(hex_str)
                    .map_err(|e| format!("invalid hex: {}", e))?;
                if bytes.len() != $len {
                    return Err(format!(
                        "expected {} hex characters, got {}",
                        $len * 2,
                        hex_str.len()
                    ));
                }
                Ok(Self(bytes.try_into().map_err(|_| "internal error: length mismatch".to_string())?))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl From<$name> for [u8; $len] {
            fn from(wrapper: $name) -> [u8; $len] {
                wrapper.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(self, f)
            }
        }

        impl fmt::LowerHex for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for byte in &self.0 {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(", stringify!($name))?;
                fmt::Display::fmt(self, f)?;
                write!(f, ")")
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = std::array::TryFromSliceError;
            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                Ok(Self(<[u8; $len]>::try_from(slice)?))
            }
        }
    };
}

// --- Type Definitions ---

define_bytes!(
    PubKey,
    32,
    "32-byte Ed25519 public key",
    [PartialEq, Eq, Hash, Default, PartialOrd, Ord]
);

define_bytes!(
    Signature,
    64,
    "64-byte Ed25519 signature",
    [PartialEq, Eq]
);

/// Multicodec code for BLAKE3 (multihash table).
const BLAKE3_CODE: u8 = 0x1e;
/// Digest length in bytes.
const DIGEST_LEN: u8 = 32;

/// Self-describing content address: `code || length || digest`.
///
/// The two-byte prefix names the algorithm (BLAKE3) and digest length, so a
/// stored address can be validated without out-of-band context. 34 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Multihash(pub [u8; 34]);

impl Multihash {
    /// Wrap a raw 32-byte BLAKE3 digest in its multihash framing.
    pub fn from_digest(digest: [u8; 32]) -> Self {
        let mut bytes = [0u8; 34];
        bytes[0] = BLAKE3_CODE;
        bytes[1] = DIGEST_LEN;
        bytes[2..].copy_from_slice(&digest);
        Self(bytes)
    }

    /// The raw digest without the self-describing prefix.
    pub fn digest(&self) -> &[u8] {
        &self.0[2..]
    }

    /// Returns the full self-describing bytes.
    pub fn as_bytes(&self) -> &[u8; 34] {
        &self.0
    }

    /// Parse from a hex string of the full 34-byte form.
    pub fn from_hex(hex_str: &str) -> Result<Self, String> {
        let bytes = hex::decode(hex_str).map_err(|e| format!("invalid hex: {}", e))?;
        Self::try_from(bytes.as_slice()).map_err(|e| e.to_string())
    }
}

impl AsRef<[u8]> for Multihash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Multihash {
    type Error = MultihashError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 34] = slice
            .try_into()
            .map_err(|_| MultihashError::BadLength(slice.len()))?;
        if bytes[0] != BLAKE3_CODE || bytes[1] != DIGEST_LEN {
            return Err(MultihashError::BadPrefix(bytes[0], bytes[1]));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multihash({})", self)
    }
}

/// Rejected multihash bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultihashError {
    #[error("expected 34 multihash bytes, got {0}")]
    BadLength(usize),

    #[error("unsupported multihash prefix {0:#04x}/{1:#04x}")]
    BadPrefix(u8, u8),
}

// --- Tests ---
