//! Hash algorithm table and incremental digest states.

use blake2::Blake2b;
use blake2::digest::consts::{U20, U32, U64};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest as _, Sha224, Sha256, Sha384, Sha512};
use std::fmt;

/// The library family backing a hash algorithm.
///
/// `Digest` algorithms are the native md5/sha family and support a
/// one-shot whole-stream code path; `Blake2` algorithms come from the
/// generichash family with per-algorithm output lengths and always run
/// through an incremental state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mechanism {
    Digest,
    Blake2,
}

/// A supported hash algorithm.
///
/// This is a closed set resolved through static tables; adding an
/// algorithm means adding a variant and its table entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    #[serde(rename = "blake2b_160")]
    Blake2b160,
    #[serde(rename = "blake2b_256")]
    Blake2b256,
    #[serde(rename = "blake2b_512")]
    Blake2b512,
}

impl Algorithm {
    /// Every supported algorithm, in table order.
    pub const ALL: [Algorithm; 9] = [
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha224,
        Algorithm::Sha256,
        Algorithm::Sha384,
        Algorithm::Sha512,
        Algorithm::Blake2b160,
        Algorithm::Blake2b256,
        Algorithm::Blake2b512,
    ];

    /// Machine identifier, as used in configuration and stored columns.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Blake2b160 => "blake2b_160",
            Self::Blake2b256 => "blake2b_256",
            Self::Blake2b512 => "blake2b_512",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Blake2b160 => "BLAKE2b-160",
            Self::Blake2b256 => "BLAKE2b-256",
            Self::Blake2b512 => "BLAKE2b-512",
        }
    }

    /// The library family backing this algorithm.
    pub fn mechanism(&self) -> Mechanism {
        match self {
            Self::Md5 | Self::Sha1 | Self::Sha224 | Self::Sha256 | Self::Sha384 | Self::Sha512 => {
                Mechanism::Digest
            }
            Self::Blake2b160 | Self::Blake2b256 | Self::Blake2b512 => Mechanism::Blake2,
        }
    }

    /// Digest output length in hexadecimal characters.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 | Self::Blake2b160 => 40,
            Self::Sha224 => 56,
            Self::Sha256 | Self::Blake2b256 => 64,
            Self::Sha384 => 96,
            Self::Sha512 | Self::Blake2b512 => 128,
        }
    }

    /// Create a fresh incremental state for this algorithm.
    pub fn state(&self) -> HashState {
        match self {
            Self::Md5 => HashState::Md5(Md5::new()),
            Self::Sha1 => HashState::Sha1(Sha1::new()),
            Self::Sha224 => HashState::Sha224(Sha224::new()),
            Self::Sha256 => HashState::Sha256(Sha256::new()),
            Self::Sha384 => HashState::Sha384(Sha384::new()),
            Self::Sha512 => HashState::Sha512(Sha512::new()),
            Self::Blake2b160 => HashState::Blake2b160(Blake2b::new()),
            Self::Blake2b256 => HashState::Blake2b256(Blake2b::new()),
            Self::Blake2b512 => HashState::Blake2b512(Blake2b::new()),
        }
    }

    /// Parse a machine identifier.
    ///
    /// An unknown identifier is a configuration error, not a runtime
    /// condition, and callers are expected to propagate it.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| crate::Error::UnknownAlgorithm(s.to_string()))
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Incremental digest state for one algorithm.
///
/// `update` may be called any number of times; `finalize` consumes the
/// state and yields the digest exactly once. A state is owned by a
/// single hashing pass and never shared across files.
pub enum HashState {
    Md5(Md5),
    Sha1(Sha1),
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
    Blake2b160(Blake2b<U20>),
    Blake2b256(Blake2b<U32>),
    Blake2b512(Blake2b<U64>),
}

impl HashState {
    /// Feed a chunk of data into the state.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha224(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha384(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Blake2b160(h) => h.update(data),
            Self::Blake2b256(h) => h.update(data),
            Self::Blake2b512(h) => h.update(data),
        }
    }

    /// Consume the state and return the hex digest.
    pub fn finalize(self) -> Digest {
        match self {
            Self::Md5(h) => Digest::from_raw(&h.finalize()),
            Self::Sha1(h) => Digest::from_raw(&h.finalize()),
            Self::Sha224(h) => Digest::from_raw(&h.finalize()),
            Self::Sha256(h) => Digest::from_raw(&h.finalize()),
            Self::Sha384(h) => Digest::from_raw(&h.finalize()),
            Self::Sha512(h) => Digest::from_raw(&h.finalize()),
            Self::Blake2b160(h) => Digest::from_raw(&h.finalize()),
            Self::Blake2b256(h) => Digest::from_raw(&h.finalize()),
            Self::Blake2b512(h) => Digest::from_raw(&h.finalize()),
        }
    }
}

/// A lowercase hexadecimal digest string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(String);

impl Digest {
    /// Build a digest from raw hash output bytes.
    pub fn from_raw(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse from a hex string, normalizing to lowercase.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(crate::Error::InvalidDigest(format!(
                "expected hex characters, got: {s}"
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// The digest as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in hex characters.
    pub fn hex_len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.0[..self.0.len().min(16)])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
