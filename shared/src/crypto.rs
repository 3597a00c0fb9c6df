//! Post-quantum signing (ML-DSA-65 / CRYSTALS-Dilithium) standing in for
//! the reference implementation's RSA-PSS. The signing policy only
//! requires a deterministic sign/verify pair over byte strings; ML-DSA
//! satisfies that and is already the asymmetric primitive this workspace
//! carries.

use crate::{BlockchainError, Hash256, Result};
use chrono::{DateTime, Utc};
use pqcrypto_dilithium::dilithium3;
use pqcrypto_traits::sign::{
    PublicKey as PQCPublicKeyTrait, SecretKey as PQCSecretKeyTrait, SignedMessage,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    MLDSA65,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    key_data: Vec<u8>,
    algorithm: SignatureAlgorithm,
}

#[derive(Debug, Clone)]
pub struct PrivateKey {
    key_data: Vec<u8>,
    algorithm: SignatureAlgorithm,
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    data: Vec<u8>,
    public_key: PublicKey,
    algorithm: SignatureAlgorithm,
    timestamp: DateTime<Utc>,
}

impl PublicKey {
    /// # Errors
    /// Infallible for this algorithm; returns `Result` for forward compatibility.
    #[allow(clippy::missing_const_for_fn)]
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Ok(Self {
            key_data: bytes,
            algorithm: SignatureAlgorithm::MLDSA65,
        })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.key_data
    }

    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    fn to_pqc_public_key(&self) -> Result<dilithium3::PublicKey> {
        dilithium3::PublicKey::from_bytes(&self.key_data).map_err(|_| {
            BlockchainError::InvalidKeySize {
                expected: dilithium3::public_key_bytes(),
                actual: self.key_data.len(),
            }
        })
    }
}

impl PrivateKey {
    /// # Errors
    /// Infallible for this algorithm; returns `Result` for forward compatibility.
    #[allow(clippy::missing_const_for_fn)]
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Ok(Self {
            key_data: bytes,
            algorithm: SignatureAlgorithm::MLDSA65,
        })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.key_data
    }

    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    fn to_pqc_secret_key(&self) -> Result<dilithium3::SecretKey> {
        dilithium3::SecretKey::from_bytes(&self.key_data).map_err(|_| {
            BlockchainError::InvalidKeySize {
                expected: dilithium3::secret_key_bytes(),
                actual: self.key_data.len(),
            }
        })
    }
}

impl KeyPair {
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn generate() -> Result<Self> {
        let (public_key_bytes, secret_key_bytes) = dilithium3::keypair();

        let public_key = PublicKey::from_bytes(public_key_bytes.as_bytes().to_vec())?;
        let private_key = PrivateKey::from_bytes(secret_key_bytes.as_bytes().to_vec())?;

        Ok(Self {
            public_key,
            private_key,
        })
    }

    /// Signs `message` with this keypair's private key.
    ///
    /// # Errors
    /// Returns an error if the stored private key is malformed.
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        let secret_key = self.private_key.to_pqc_secret_key()?;
        let signed_message = dilithium3::sign(message, &secret_key);

        Ok(Signature {
            data: signed_message.as_bytes().to_vec(),
            public_key: self.public_key.clone(),
            algorithm: SignatureAlgorithm::MLDSA65,
            timestamp: Utc::now(),
        })
    }
}

impl Signature {
    /// Verifies the signature against `message`.
    ///
    /// # Errors
    /// Returns an error if the embedded public key is malformed; a
    /// mismatched signature is reported as `Ok(false)`, not an error.
    pub fn verify(&self, message: &[u8]) -> Result<bool> {
        let public_key = self.public_key.to_pqc_public_key()?;
        let signed_message =
            SignedMessage::from_bytes(&self.data).map_err(|_| BlockchainError::InvalidSignature)?;

        Ok(dilithium3::open(&signed_message, &public_key)
            .map(|verified| verified == message)
            .unwrap_or(false))
    }

    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Zeroize for PrivateKey {
    fn zeroize(&mut self) {
        self.key_data.zeroize();
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Signs a domain hash with the given keypair.
///
/// # Errors
/// Returns an error if signing fails.
pub fn sign_transaction_hash(tx_hash: &Hash256, keypair: &KeyPair) -> Result<Signature> {
    keypair.sign(tx_hash.as_bytes())
}

/// Verifies a signature against a domain hash.
///
/// # Errors
/// Returns an error if verification itself fails (malformed key/signature
/// bytes); a mismatched signature is `Ok(false)`.
pub fn verify_transaction_signature(tx_hash: &Hash256, signature: &Signature) -> Result<bool> {
    signature.verify(tx_hash.as_bytes())
}

/// # Errors
/// Infallible for this algorithm; returns `Result` for forward compatibility.
pub fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey> {
    PublicKey::from_bytes(bytes.to_vec())
}

#[must_use]
pub const fn signature_from_bytes(
    signature_data: Vec<u8>,
    public_key: PublicKey,
    timestamp: DateTime<Utc>,
) -> Signature {
    Signature {
        data: signature_data,
        public_key,
        algorithm: SignatureAlgorithm::MLDSA65,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_and_verifies_a_message() {
        let keypair = KeyPair::generate().unwrap();
        let message = b"post-quantum ledger transaction";

        let signature = keypair.sign(message).unwrap();
        assert!(signature.verify(message).unwrap());
    }

    #[test]
    fn rejects_a_tampered_message() {
        let keypair = KeyPair::generate().unwrap();
        let signature = keypair.sign(b"original payload").unwrap();
        assert!(!signature.verify(b"tampered payload").unwrap());
    }

    #[test]
    fn transaction_hash_signing_helpers_round_trip() {
        let keypair = KeyPair::generate().unwrap();
        let hash = Hash256::sha256(b"some transaction body");
        let signature = sign_transaction_hash(&hash, &keypair).unwrap();
        assert!(verify_transaction_signature(&hash, &signature).unwrap());
    }
}
