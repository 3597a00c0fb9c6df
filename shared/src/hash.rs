//! 256-bit domain hash used to identify blocks, transactions and UTXOs.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 digest, displayed and parsed as lowercase hex. Serializes as
/// that same hex string rather than a byte array, matching the external
/// interfaces' hex-encoded hash and signature fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash256([u8; 32]);

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex_string = String::deserialize(deserializer)?;
        Self::try_from(hex_string.as_str()).map_err(D::Error::custom)
    }
}

impl Hash256 {
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Computes the SHA-256 digest of `data`.
    #[must_use]
    pub fn sha256(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        Self(hash)
    }

    /// Hashes the two digests concatenated as ASCII hex, the Merkle pairing step.
    #[must_use]
    pub fn combine(left: &Self, right: &Self) -> Self {
        let mut s = left.to_string();
        s.push_str(&right.to_string());
        Self::sha256(s.as_bytes())
    }

    /// True if the hex representation starts with `difficulty` '0' characters.
    #[must_use]
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        self.leading_zero_hex_chars() >= difficulty
    }

    /// Number of leading '0' hex characters in the digest's hex encoding.
    #[must_use]
    pub fn leading_zero_hex_chars(&self) -> u32 {
        let hex = self.to_string();
        hex.chars().take_while(|c| *c == '0').count() as u32
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl TryFrom<&str> for Hash256 {
    type Error = hex::FromHexError;

    fn try_from(hex_string: &str) -> Result<Self, Self::Error> {
        let bytes = hex::decode(hex_string)?;
        let mut hash = [0u8; 32];
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        hash.copy_from_slice(&bytes);
        Ok(Self(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_displays_as_64_zero_chars() {
        let hash = Hash256::zero();
        assert_eq!(hash.to_string(), "0".repeat(64));
    }

    #[test]
    fn sha256_of_nonempty_input_is_nonzero() {
        let hash = Hash256::sha256(b"hello world");
        assert_ne!(hash, Hash256::zero());
    }

    #[test]
    fn difficulty_is_measured_in_hex_characters() {
        let hash = Hash256::try_from("00000abc00000000000000000000000000000000000000000000000000000000".get(0..64).unwrap()).unwrap();
        assert!(hash.meets_difficulty(5));
        assert!(!hash.meets_difficulty(6));
    }

    #[test]
    fn round_trips_through_hex() {
        let hash = Hash256::sha256(b"round trip");
        let parsed = Hash256::try_from(hash.to_string().as_str()).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn combine_is_order_sensitive() {
        let a = Hash256::sha256(b"a");
        let b = Hash256::sha256(b"b");
        assert_ne!(Hash256::combine(&a, &b), Hash256::combine(&b, &a));
    }
}
