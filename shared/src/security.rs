//! Auxiliary security utilities: Merkle membership proofs, password-based
//! key derivation and symmetric encryption for wallet-file-adjacent
//! callers. None of this is consulted by block or transaction validation;
//! it exists for whatever CLI/wallet layer needs it, grounded in the
//! reference implementation's `security.py`.

use crate::{BlockchainError, Hash256, Result};
use aes_gcm::aead::{Aead, KeyInit, OsRng as AeadOsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// One step of a Merkle inclusion proof: a sibling hash and whether it
/// sits to the left of the hash being proven at that level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: Hash256,
    pub sibling_is_left: bool,
}

/// Builds an inclusion proof for the leaf at `index` against `leaves`.
/// Returns `None` if `index` is out of range.
#[must_use]
pub fn generate_merkle_proof(leaves: &[Hash256], index: usize) -> Option<Vec<ProofStep>> {
    if index >= leaves.len() {
        return None;
    }

    let mut level: Vec<Hash256> = leaves.to_vec();
    let mut position = index;
    let mut proof = Vec::new();

    while level.len() > 1 {
        if level.len() % 2 != 0 {
            level.push(*level.last().unwrap());
        }

        let sibling_position = if position % 2 == 0 {
            position + 1
        } else {
            position - 1
        };
        proof.push(ProofStep {
            sibling: level[sibling_position],
            sibling_is_left: sibling_position < position,
        });

        let mut next_level = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks(2) {
            next_level.push(Hash256::combine(&pair[0], &pair[1]));
        }
        level = next_level;
        position /= 2;
    }

    Some(proof)
}

/// Verifies that `leaf` is a member of the tree with the given `root`,
/// given its inclusion proof.
#[must_use]
pub fn verify_merkle_proof(leaf: Hash256, proof: &[ProofStep], root: Hash256) -> bool {
    let mut current = leaf;
    for step in proof {
        current = if step.sibling_is_left {
            Hash256::combine(&step.sibling, &current)
        } else {
            Hash256::combine(&current, &step.sibling)
        };
    }
    current == root
}

/// Derives a 32-byte key from `password` and `salt` via PBKDF2-HMAC-SHA256.
#[must_use]
pub fn derive_key(password: &str, salt: &[u8; SALT_LEN]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Hashes `password` with a freshly generated random salt.
#[must_use]
pub fn hash_password(password: &str) -> ([u8; 32], [u8; SALT_LEN]) {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    (derive_key(password, &salt), salt)
}

/// Verifies `password` against a previously derived key and salt.
#[must_use]
pub fn verify_password(password: &str, expected_key: &[u8; 32], salt: &[u8; SALT_LEN]) -> bool {
    derive_key(password, salt) == *expected_key
}

/// Encrypts `plaintext` under `key`, prepending the randomly generated
/// nonce to the ciphertext.
///
/// # Errors
/// Returns an error if the underlying AEAD cipher rejects the key or
/// fails to encrypt.
pub fn encrypt(plaintext: &[u8], key: &[u8; 32]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| BlockchainError::CryptographicError(e.to_string()))?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    AeadOsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| BlockchainError::CryptographicError(e.to_string()))?;
    let mut out = nonce_bytes.to_vec();
    out.append(&mut ciphertext);
    Ok(out)
}

/// Decrypts data produced by [`encrypt`].
///
/// # Errors
/// Returns an error if the payload is too short to contain a nonce, or if
/// the AEAD tag fails to verify.
pub fn decrypt(payload: &[u8], key: &[u8; 32]) -> Result<Vec<u8>> {
    if payload.len() < NONCE_LEN {
        return Err(BlockchainError::CryptographicError(
            "ciphertext shorter than nonce".to_string(),
        ));
    }
    let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| BlockchainError::CryptographicError(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| BlockchainError::CryptographicError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merkle_proof_round_trips_for_every_leaf() {
        let leaves: Vec<Hash256> = (0..5).map(|i| Hash256::sha256(&[i])).collect();
        let mut level = leaves.clone();
        while level.len() > 1 {
            if level.len() % 2 != 0 {
                level.push(*level.last().unwrap());
            }
            level = level
                .chunks(2)
                .map(|pair| Hash256::combine(&pair[0], &pair[1]))
                .collect();
        }
        let root = level[0];

        for (index, leaf) in leaves.iter().enumerate() {
            let proof = generate_merkle_proof(&leaves, index).unwrap();
            assert!(verify_merkle_proof(*leaf, &proof, root));
        }
    }

    #[test]
    fn merkle_proof_rejects_wrong_root() {
        let leaves: Vec<Hash256> = (0..3).map(|i| Hash256::sha256(&[i])).collect();
        let proof = generate_merkle_proof(&leaves, 0).unwrap();
        assert!(!verify_merkle_proof(leaves[0], &proof, Hash256::zero()));
    }

    #[test]
    fn password_hash_and_verify_round_trip() {
        let (key, salt) = hash_password("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &key, &salt));
        assert!(!verify_password("wrong password", &key, &salt));
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = [7u8; 32];
        let plaintext = b"wallet private key material";
        let ciphertext = encrypt(plaintext, &key).unwrap();
        assert_ne!(ciphertext, plaintext);
        let decrypted = decrypt(&ciphertext, &key).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn decrypt_rejects_tampered_ciphertext() {
        let key = [3u8; 32];
        let mut ciphertext = encrypt(b"payload", &key).unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;
        assert!(decrypt(&ciphertext, &key).is_err());
    }
}
