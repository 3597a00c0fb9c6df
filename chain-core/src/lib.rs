//! The ledger core: UTXOs, transactions, blocks, the contract engine, the
//! keystore, and the blockchain that wires them together with a pluggable
//! consensus strategy.

pub mod block;
pub mod blockchain;
pub mod contract;
pub mod error;
pub mod keystore;
pub mod transaction;
pub mod utxo;

pub use block::Block;
pub use blockchain::{Blockchain, BlockchainStats, NetworkParams, GENESIS_ADDRESS, GENESIS_SUPPLY};
pub use contract::{ContractCall, ContractCode, ContractEngine, ContractId, ContractResult};
pub use error::CoreError;
pub use keystore::{InMemoryKeystore, Keystore};
pub use transaction::{ContractData, Transaction, TransactionBuilder, TransactionType, TxInput, TxOutput, MINERS_ADDRESS};
pub use utxo::{Utxo, UtxoSet};

pub use error::Result;
