//! The block: an ordered batch of transactions under a proof-of-work (or
//! other consensus-strategy) nonce, with a Merkle root over its
//! transaction ids for logarithmic-size membership proofs.

use crate::contract::{ContractEngine, ContractResult};
use crate::error::{CoreError, Result};
use crate::transaction::{ContractData, Transaction, TransactionType};
use crate::utxo::UtxoSet;
use consensus::ConsensusBlock;
use serde::{Deserialize, Serialize};
use shared::{Address, Hash256, Signature, Timestamp};
use std::collections::HashMap;

/// The fields that participate in a block's hash. `hash` itself,
/// `merkle_root`, `signatures` and `contract_results` are all derived or
/// attached after the hash is computed, so none of them feed back into it.
#[derive(Serialize)]
struct HashableBlock<'a> {
    index: u64,
    previous_hash: Hash256,
    timestamp: Timestamp,
    nonce: u64,
    transactions: &'a [Transaction],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub previous_hash: Hash256,
    pub timestamp: Timestamp,
    pub nonce: u64,
    pub hash: Hash256,
    pub merkle_root: Hash256,
    pub transactions: Vec<Transaction>,
    /// Validator signatures collected by PoS-family consensus strategies.
    /// Informational: not part of the hashed payload.
    pub signatures: HashMap<Address, Signature>,
    /// Contract execution outcomes, keyed by the originating transaction's
    /// hex id (falling back to `tx_<index>` if a contract transaction
    /// somehow lacks one, which cannot happen once `id` is always assigned
    /// at construction — kept as a named defensive path, not a live one).
    pub contract_results: HashMap<String, ContractResult>,
}

impl Block {
    /// Assembles an unmined block: computes the Merkle root over
    /// `transactions` and an initial hash at `nonce = 0`. Call
    /// [`mine`](Self::mine) to satisfy a proof-of-work difficulty target,
    /// or leave the initial hash as-is under a non-PoW consensus strategy.
    #[must_use]
    pub fn new(index: u64, previous_hash: Hash256, transactions: Vec<Transaction>, timestamp: Timestamp) -> Self {
        let merkle_root = merkle_root(&transactions);
        let mut block = Self {
            index,
            previous_hash,
            timestamp,
            nonce: 0,
            hash: Hash256::zero(),
            merkle_root,
            transactions,
            signatures: HashMap::new(),
            contract_results: HashMap::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// The genesis block: index 0, a zero previous hash, and whatever
    /// transactions the caller supplies (typically a single bootstrap
    /// coinbase). Mined separately by the caller, like any other block.
    #[must_use]
    pub fn genesis(transactions: Vec<Transaction>, timestamp: Timestamp) -> Self {
        Self::new(0, Hash256::zero(), transactions, timestamp)
    }

    #[must_use]
    pub fn calculate_hash(&self) -> Hash256 {
        let hashable = HashableBlock {
            index: self.index,
            previous_hash: self.previous_hash,
            timestamp: self.timestamp,
            nonce: self.nonce,
            transactions: &self.transactions,
        };
        shared::canonical_hash(&hashable).unwrap_or_else(|_| Hash256::zero())
    }

    /// Increments `nonce` until `hash` has `difficulty` leading hex zeros.
    pub fn mine(&mut self, difficulty: u32) {
        loop {
            self.hash = self.calculate_hash();
            if self.hash.meets_difficulty(difficulty) {
                break;
            }
            self.nonce += 1;
        }
    }

    /// Records that `validator` signed off on this block. Informational;
    /// does not affect `hash`.
    pub fn add_signature(&mut self, validator: Address, signature: Signature) {
        self.signatures.insert(validator, signature);
    }

    #[must_use]
    pub fn has_signature_from(&self, validator: &Address) -> bool {
        self.signatures.contains_key(validator)
    }

    /// Runs every contract-type transaction's deploy/execute call against
    /// `engine`, resolving each sender from the UTXO spent by the
    /// transaction's first input, and records the outcome in
    /// `contract_results`.
    ///
    /// # Errors
    /// Returns an error if a contract transaction's first input does not
    /// resolve to a known UTXO.
    pub fn execute_contracts(&mut self, engine: &mut ContractEngine, utxo_set: &UtxoSet) -> Result<()> {
        for (index, tx) in self.transactions.iter().enumerate() {
            if tx.tx_type != TransactionType::Contract {
                continue;
            }
            let Some(contract_data) = &tx.contract_data else {
                continue;
            };
            let Some(first_input) = tx.inputs.first() else {
                continue;
            };
            let sender = utxo_set
                .get(&first_input.tx_id, first_input.output_index)
                .map(|utxo| utxo.owner.clone())
                .ok_or_else(|| CoreError::UtxoMissing {
                    tx_id: first_input.tx_id.to_string(),
                    output_index: first_input.output_index,
                })?;

            let result = match contract_data {
                ContractData::Deploy { code, init_params } => {
                    match engine.deploy(code, sender.clone(), init_params) {
                        Ok(contract_id) => ContractResult::Ok(contract_id),
                        Err(e) => ContractResult::Err(e.to_string()),
                    }
                }
                ContractData::Execute(call) => {
                    match engine.execute(&call.contract_id, &call.method, &call.params, &sender) {
                        Ok(result) => result,
                        Err(e) => ContractResult::Err(e.to_string()),
                    }
                }
            };

            let key = if tx.id != Hash256::zero() {
                tx.id.to_string()
            } else {
                format!("tx_{index}")
            };
            self.contract_results.insert(key, result);
        }
        Ok(())
    }

    #[must_use]
    pub fn coinbase_transaction(&self) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.is_coinbase())
    }
}

impl ConsensusBlock for Block {
    fn claimed_hash(&self) -> Hash256 {
        self.hash
    }

    fn recomputed_hash(&self) -> Hash256 {
        self.calculate_hash()
    }
}

/// Builds a Merkle root over transaction ids, duplicating the final leaf
/// at each level when the level has an odd number of nodes.
#[must_use]
pub fn merkle_root(transactions: &[Transaction]) -> Hash256 {
    if transactions.is_empty() {
        return Hash256::zero();
    }

    let mut level: Vec<Hash256> = transactions.iter().map(|tx| tx.id).collect();
    while level.len() > 1 {
        if level.len() % 2 != 0 {
            level.push(*level.last().unwrap());
        }
        level = level
            .chunks(2)
            .map(|pair| Hash256::combine(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractCode;
    use crate::transaction::MINERS_ADDRESS;
    use crate::utxo::Utxo;

    #[test]
    fn mining_produces_a_hash_meeting_the_difficulty() {
        let coinbase = Transaction::coinbase(100, "miner".to_string(), 0);
        let mut block = Block::genesis(vec![coinbase], 0);
        block.mine(2);
        assert!(block.hash.meets_difficulty(2));
    }

    #[test]
    fn hash_is_stable_across_recomputation() {
        let coinbase = Transaction::coinbase(100, "miner".to_string(), 0);
        let mut block = Block::genesis(vec![coinbase], 0);
        block.mine(1);
        assert_eq!(block.hash, block.recomputed_hash());
    }

    #[test]
    fn single_transaction_merkle_root_is_its_own_id() {
        let coinbase = Transaction::coinbase(100, "miner".to_string(), 0);
        let root = merkle_root(std::slice::from_ref(&coinbase));
        assert_eq!(root, coinbase.id);
    }

    #[test]
    fn merkle_root_of_an_empty_transaction_list_is_zero() {
        assert_eq!(merkle_root(&[]), Hash256::zero());
    }

    #[test]
    fn signatures_do_not_affect_the_block_hash() {
        let coinbase = Transaction::coinbase(100, "miner".to_string(), 0);
        let mut block = Block::genesis(vec![coinbase], 0);
        let hash_before = block.calculate_hash();
        let keypair = shared::KeyPair::generate().unwrap();
        let signature = keypair.sign(b"vote").unwrap();
        block.add_signature("validator-a".to_string(), signature);
        assert_eq!(hash_before, block.calculate_hash());
        assert!(block.has_signature_from(&"validator-a".to_string()));
    }

    #[test]
    fn executing_a_contract_transaction_records_its_result() {
        let mut utxo_set = UtxoSet::new();
        let funding_tx = Hash256::sha256(b"funding");
        utxo_set.add(Utxo::new(funding_tx, 0, 1000, "alice".to_string()));

        let mut engine = ContractEngine::new();
        let contract_id = engine
            .deploy(&ContractCode::Token, "alice".to_string(), &["1000".to_string()])
            .unwrap();

        let call = crate::contract::ContractCall {
            contract_id,
            method: "balance_of".to_string(),
            params: vec!["alice".to_string()],
        };
        let tx = Transaction::contract_transaction(
            ContractData::Execute(call),
            &"alice".to_string(),
            &utxo_set,
            10,
            0,
        )
        .unwrap();
        assert_eq!(tx.outputs[0].recipient, MINERS_ADDRESS);

        let mut block = Block::new(1, Hash256::zero(), vec![tx.clone()], 0);
        block.execute_contracts(&mut engine, &utxo_set).unwrap();

        assert_eq!(
            block.contract_results.get(&tx.id.to_string()),
            Some(&ContractResult::Ok("1000".to_string()))
        );
    }
}
