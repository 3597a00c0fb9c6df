//! Persisted chain file: the external JSON interface the base spec's §6
//! describes, reconstructed here since the CLI is the one component that
//! actually needs a file to survive between invocations (persistence
//! durability itself stays out of scope, per the base spec's framing of
//! the on-disk format as an external collaborator's concern — this is a
//! thin, non-hardened shape, not a guaranteed-stable format).

use chain_core::{Block, Blockchain, InMemoryKeystore, NetworkParams, Transaction, Utxo};
use consensus::{ConsensusKind, ProofOfWork};
use serde::{Deserialize, Serialize};
use shared::{Address, Amount, PublicKey};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// The full on-disk shape: chain, consensus parameters, mempool, the
/// replayable UTXO snapshot, and every address this node has ever
/// resolved a public key for. `utxo_set` is redundant with `chain` (it is
/// always rebuilt by replay on load) but is written out for external
/// readers, matching the base spec's documented file shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChainFile {
    pub chain: Vec<Block>,
    pub difficulty: u32,
    pub pending_transactions: Vec<Transaction>,
    pub mining_reward: Amount,
    pub consensus_type: String,
    pub utxo_set: BTreeMap<String, Utxo>,
    pub keystore: BTreeMap<Address, PublicKey>,
}

impl ChainFile {
    /// Loads `path`, or builds a fresh genesis-only chain file if it
    /// doesn't exist yet.
    ///
    /// # Errors
    /// Returns an error if `path` exists but is not a valid chain file.
    pub fn load_or_genesis(path: &Path, difficulty: u32) -> AppResult<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)
                .map_err(|e| AppError::ChainFileInvalid(e.to_string()))
        } else {
            let params = NetworkParams {
                difficulty,
                mining_reward: chain_core::blockchain::DEFAULT_MINING_REWARD,
            };
            let blockchain = Blockchain::new(
                Box::new(ProofOfWork::new(difficulty)),
                Box::new(InMemoryKeystore::new()),
                params,
            );
            Ok(Self::from_blockchain(&blockchain, BTreeMap::new()))
        }
    }

    /// Saves this chain file to `path`, pretty-printed.
    ///
    /// # Errors
    /// Returns an error if serialization or the write itself fails.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Snapshots `blockchain` into a persistable [`ChainFile`], merging in
    /// `keystore` — the set of address-to-public-key registrations this
    /// invocation knows about, since [`chain_core::keystore::Keystore`]
    /// itself exposes no iteration surface.
    #[must_use]
    pub fn from_blockchain(blockchain: &Blockchain, keystore: BTreeMap<Address, PublicKey>) -> Self {
        let utxo_set = blockchain
            .utxo_set()
            .iter()
            .map(|utxo| (format!("{}:{}", utxo.tx_id, utxo.output_index), utxo.clone()))
            .collect();

        Self {
            chain: blockchain.chain().to_vec(),
            difficulty: blockchain.stats().difficulty,
            pending_transactions: blockchain.mempool().to_vec(),
            mining_reward: chain_core::blockchain::DEFAULT_MINING_REWARD,
            consensus_type: ConsensusKind::ProofOfWork.as_str().to_string(),
            utxo_set,
            keystore,
        }
    }

    /// Rebuilds a live [`Blockchain`] from this file's chain and mempool,
    /// registering every known address's public key with the fresh
    /// keystore. The UTXO set is recomputed by replay, not read from
    /// `utxo_set` directly (the source of truth is always the chain).
    ///
    /// # Errors
    /// Returns an error if the stored chain fails structural validation.
    pub fn into_blockchain(self) -> AppResult<Blockchain> {
        let params = NetworkParams {
            difficulty: self.difficulty,
            mining_reward: self.mining_reward,
        };
        let mut blockchain = Blockchain::from_chain(
            Box::new(ProofOfWork::new(self.difficulty)),
            Box::new(InMemoryKeystore::new()),
            params,
            self.chain,
            self.pending_transactions,
        )?;
        for (address, public_key) in self.keystore {
            blockchain.register_public_key(address, public_key);
        }
        Ok(blockchain)
    }
}
