//! Types shared across the ledger, consensus and networking crates.

use serde::{Deserialize, Serialize};

/// An opaque account identifier. The reference implementation uses plain
/// strings (wallet addresses, the `GENESIS_ADDRESS` and `MINERS` sentinels);
/// this type preserves that shape rather than assuming a script encoding.
pub type Address = String;

/// Unique identifier of a transaction.
pub type TxId = crate::Hash256;

/// Unique identifier of a block.
pub type BlockId = crate::Hash256;

/// Monetary amount, smallest indivisible unit.
pub type Amount = u64;

/// Unix timestamp, seconds.
pub type Timestamp = i64;

/// Height of a block within the chain.
pub type BlockHeight = u64;

/// Index of an output within a transaction.
pub type OutputIndex = u32;

/// Reference to one output of one transaction — the UTXO store's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_id: TxId,
    pub output_index: OutputIndex,
}

impl OutPoint {
    #[must_use]
    pub const fn new(tx_id: TxId, output_index: OutputIndex) -> Self {
        Self {
            tx_id,
            output_index,
        }
    }
}

/// Network environment a node is configured for.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkType {
    Mainnet,
    Testnet,
    #[default]
    Devnet,
    Regtest,
}

/// Node-wide configuration: network identity, P2P binding and data location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub network: NetworkType,
    pub p2p_port: u16,
    pub bind_address: String,
    pub bootstrap_peers: Vec<String>,
    pub data_dir: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkType::Devnet,
            p2p_port: 8333,
            bind_address: "127.0.0.1".to_string(),
            bootstrap_peers: vec![],
            data_dir: "./data".to_string(),
        }
    }
}

/// Information about a connected peer, as tracked by the gossip layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub address: String,
    pub chain_height: BlockHeight,
    pub connected: bool,
}
