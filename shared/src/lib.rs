//! Types and primitives shared by the ledger core, the consensus layer
//! and the node binary: domain hashing, canonical encoding, post-quantum
//! signing, the common error type, and a handful of wallet-adjacent
//! security utilities.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod security;
pub mod types;

pub use canonical::{canonical_bytes, canonical_hash};
pub use crypto::{
    public_key_from_bytes, sign_transaction_hash, signature_from_bytes,
    verify_transaction_signature, KeyPair, PrivateKey, PublicKey, Signature, SignatureAlgorithm,
};
pub use error::BlockchainError;
pub use hash::Hash256;
pub use types::{
    Address, Amount, BlockHeight, BlockId, NetworkType, NodeConfig, OutPoint, OutputIndex,
    PeerInfo, Timestamp, TxId,
};

pub type Result<T> = std::result::Result<T, BlockchainError>;
