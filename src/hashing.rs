//! Hash functions selectable by name.
//!
//! Node configuration refers to hash algorithms by name (`Keccak`, `Blake2b`, `Fnv`).
//! [`HasherType`] parses those names and builds the matching [`Hasher`].

use crate::error::{Result, StorageError};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use bytes::Bytes;
use sha3::Keccak256;
use std::fmt;
use std::str::FromStr;

type Blake2b256 = Blake2b<U32>;

/// A hash function producing fixed-size digests.
pub trait Hasher: Send + Sync {
    /// Hashes `data` and returns the digest.
    fn compute(&self, data: &[u8]) -> Bytes;

    /// Returns the digest of the empty input.
    fn empty_hash(&self) -> Bytes {
        self.compute(&[])
    }

    /// Digest size in bytes.
    fn size(&self) -> usize;
}

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HasherType {
    Keccak,
    Blake2b,
    Fnv,
}

impl HasherType {
    /// Builds a hasher for this algorithm.
    pub fn new_hasher(self) -> Box<dyn Hasher> {
        match self {
            HasherType::Keccak => Box::new(KeccakHasher),
            HasherType::Blake2b => Box::new(Blake2bHasher),
            HasherType::Fnv => Box::new(FnvHasher),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HasherType::Keccak => "Keccak",
            HasherType::Blake2b => "Blake2b",
            HasherType::Fnv => "Fnv",
        }
    }
}

impl FromStr for HasherType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Keccak" => Ok(HasherType::Keccak),
            "Blake2b" => Ok(HasherType::Blake2b),
            "Fnv" => Ok(HasherType::Fnv),
            other => Err(StorageError::NotSupportedHashType(other.to_string())),
        }
    }
}

impl fmt::Display for HasherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a hasher from its configured name.
pub fn new_hasher(name: &str) -> Result<Box<dyn Hasher>> {
    Ok(name.parse::<HasherType>()?.new_hasher())
}

/// Keccak-256 (the pre-standard SHA-3 padding).
#[derive(Debug, Default, Clone, Copy)]
pub struct KeccakHasher;

impl Hasher for KeccakHasher {
    fn compute(&self, data: &[u8]) -> Bytes {
        Bytes::from(Keccak256::digest(data).to_vec())
    }

    fn size(&self) -> usize {
        32
    }
}

/// BLAKE2b with a 256-bit digest.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake2bHasher;

impl Hasher for Blake2bHasher {
    fn compute(&self, data: &[u8]) -> Bytes {
        Bytes::from(Blake2b256::digest(data).to_vec())
    }

    fn size(&self) -> usize {
        32
    }
}

/// 128-bit FNV-1a, big-endian output.
#[derive(Debug, Default, Clone, Copy)]
pub struct FnvHasher;

const FNV128_OFFSET_BASIS: u128 = 0x6c62272e07bb014262b821756295c58d;
const FNV128_PRIME: u128 = 0x0000000001000000000000000000013b;

impl Hasher for FnvHasher {
    fn compute(&self, data: &[u8]) -> Bytes {
        let hash = data.iter().fold(FNV128_OFFSET_BASIS, |hash, &byte| {
            (hash ^ byte as u128).wrapping_mul(FNV128_PRIME)
        });
        Bytes::copy_from_slice(&hash.to_be_bytes())
    }

    fn size(&self) -> usize {
        16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hasher_type() {
        assert_eq!("Keccak".parse::<HasherType>().unwrap(), HasherType::Keccak);
        assert_eq!("Blake2b".parse::<HasherType>().unwrap(), HasherType::Blake2b);
        assert_eq!("Fnv".parse::<HasherType>().unwrap(), HasherType::Fnv);
        assert!(matches!(
            "sha256".parse::<HasherType>(),
            Err(StorageError::NotSupportedHashType(name)) if name == "sha256"
        ));
    }

    #[test]
    fn test_new_hasher_unknown_name() {
        assert!(new_hasher("md5").is_err());
        assert!(new_hasher("Fnv").is_ok());
    }

    #[test]
    fn test_keccak_empty_hash() {
        let hasher = HasherType::Keccak.new_hasher();
        assert_eq!(
            hex::encode(hasher.empty_hash()),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(hasher.size(), 32);
    }

    #[test]
    fn test_blake2b_empty_hash() {
        let hasher = HasherType::Blake2b.new_hasher();
        assert_eq!(
            hex::encode(hasher.empty_hash()),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn test_fnv_digest() {
        let hasher = HasherType::Fnv.new_hasher();
        assert_eq!(
            hex::encode(hasher.empty_hash()),
            "6c62272e07bb014262b821756295c58d"
        );
        let a = hasher.compute(b"peer-1");
        assert_eq!(a.len(), hasher.size());
        assert_eq!(a, hasher.compute(b"peer-1"));
        assert_ne!(a, hasher.compute(b"peer-2"));
    }

    #[test]
    fn test_display_round_trip_names() {
        for t in [HasherType::Keccak, HasherType::Blake2b, HasherType::Fnv] {
            assert_eq!(t.to_string().parse::<HasherType>().unwrap(), t);
        }
    }
}
