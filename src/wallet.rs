//! Wallet file handling: a keypair persisted as hex-encoded key material,
//! matching the PEM-replacement the base spec's external interfaces call
//! for (§6: "whatever the chosen signature scheme's key serialization
//! naturally produces ... hex-encoded"). The address is the first 40 hex
//! characters of `SHA256(public key bytes)`, unchanged from the base spec.

use serde::{Deserialize, Serialize};
use shared::{Hash256, KeyPair, PrivateKey, PublicKey};
use std::fs;
use std::path::Path;

use crate::error::{AppError, AppResult};

const ADDRESS_HEX_CHARS: usize = 40;

#[derive(Debug, Serialize, Deserialize)]
struct WalletFile {
    address: String,
    public_key: String,
    private_key: String,
}

pub struct Wallet {
    pub address: String,
    pub keypair: KeyPair,
}

/// The address a public key resolves to: the first 40 hex characters of
/// its SHA-256 digest.
#[must_use]
pub fn address_of(public_key: &PublicKey) -> String {
    let hash = Hash256::sha256(public_key.as_bytes());
    hash.to_string()[..ADDRESS_HEX_CHARS].to_string()
}

impl Wallet {
    /// Generates a fresh keypair and writes it to `path` as hex-encoded
    /// key material.
    ///
    /// # Errors
    /// Returns an error if key generation or writing the file fails.
    pub fn create(path: &Path) -> AppResult<Self> {
        let keypair = KeyPair::generate()?;
        let address = address_of(&keypair.public_key);

        let file = WalletFile {
            address: address.clone(),
            public_key: hex::encode(keypair.public_key.as_bytes()),
            private_key: hex::encode(keypair.private_key.as_bytes()),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path, json)?;

        Ok(Self { address, keypair })
    }

    /// Loads a previously created wallet from `path`.
    ///
    /// # Errors
    /// Returns an error if the file is missing, malformed, or its key
    /// material fails to parse.
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| AppError::WalletNotFound {
            path: path.display().to_string(),
            source: e,
        })?;
        let file: WalletFile = serde_json::from_str(&contents)?;

        let public_bytes = hex::decode(&file.public_key)?;
        let private_bytes = hex::decode(&file.private_key)?;
        let public_key = PublicKey::from_bytes(public_bytes)?;
        let private_key = PrivateKey::from_bytes(private_bytes)?;

        Ok(Self {
            address: file.address,
            keypair: KeyPair {
                public_key,
                private_key,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_load_round_trips_the_address_and_keys() {
        let dir = std::env::temp_dir().join(format!("wallet-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("wallet.json");

        let created = Wallet::create(&path).unwrap();
        let loaded = Wallet::load(&path).unwrap();

        assert_eq!(created.address, loaded.address);
        assert_eq!(
            created.keypair.public_key.as_bytes(),
            loaded.keypair.public_key.as_bytes()
        );
        assert_eq!(created.address.len(), ADDRESS_HEX_CHARS);

        fs::remove_dir_all(&dir).ok();
    }
}
