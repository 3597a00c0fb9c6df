use thiserror::Error;

/// Errors shared across the ledger, consensus and networking crates.
///
/// Variants are grouped the way the error handling design groups them:
/// structural, cryptographic, ledger, consensus and policy failures.
#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("invalid block: {0}")]
    InvalidBlock(String),

    #[error("invalid hash")]
    InvalidHash,

    #[error("insufficient difficulty")]
    InsufficientDifficulty,

    #[error("nonce not found")]
    NonceNotFound,

    #[error("utxo not found")]
    UtxoNotFound,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid key size: expected {expected}, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    #[error("cryptographic error: {0}")]
    CryptographicError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("io error: {0}")]
    IoError(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("consensus error: {0}")]
    ConsensusError(String),

    #[error("policy violation: {0}")]
    PolicyViolation(String),
}
