//! Ledger-level failures, layered over [`shared::BlockchainError`] the way
//! this workspace's crates build narrower error types on top of the
//! shared base enum.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("referenced utxo {tx_id}:{output_index} does not exist")]
    UtxoMissing { tx_id: String, output_index: u32 },

    #[error("referenced utxo {tx_id}:{output_index} is already spent")]
    UtxoAlreadySpent { tx_id: String, output_index: u32 },

    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("no public key registered for address {0}")]
    UnknownSigner(String),

    #[error("signature verification failed for input {0}")]
    SignatureInvalid(usize),

    #[error("sum of outputs exceeds sum of inputs")]
    ValueImbalance,

    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("block index {got} does not follow previous index {expected}")]
    BadIndex { expected: u64, got: u64 },

    #[error("block's previous_hash does not match the tip of the chain")]
    BrokenChainLink,

    #[error("block hash does not match its recomputed value")]
    HashMismatch,

    #[error("block failed consensus validation under {0}")]
    ConsensusRejected(&'static str),

    #[error("contract engine error: {0}")]
    Contract(String),

    #[error(transparent)]
    Shared(#[from] shared::BlockchainError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
