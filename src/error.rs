//! The binary's own error type, layered over the library crates' errors
//! the way `chain-core`'s and `consensus`'s error types layer over
//! `shared`'s — plus the IO/encoding failures that only the CLI/gossip
//! layer can produce.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("wallet file not found at {path}")]
    WalletNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("chain file is corrupt or unreadable: {0}")]
    ChainFileInvalid(String),

    #[error("insufficient funds to send this transaction")]
    InsufficientFunds,

    #[error("transaction rejected by the mempool")]
    TransactionRejected,

    #[error("no peer reachable at {0}")]
    PeerUnreachable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Hex(#[from] hex::FromHexError),

    #[error(transparent)]
    Core(#[from] chain_core::CoreError),

    #[error(transparent)]
    Crypto(#[from] shared::BlockchainError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
