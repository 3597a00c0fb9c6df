//! Practical Byzantine Fault Tolerance: a view-based primary rotation
//! with prepare/commit quorums at `2f + 1`, `f = (n - 1) / 3`.

use crate::engine::{ConsensusBlock, ConsensusEngine};
use shared::{Address, Hash256};
use std::collections::{HashMap, HashSet};

pub const MIN_VALIDATORS: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct PracticalByzantineFaultTolerance {
    validators: HashSet<Address>,
    current_view: u64,
    primary: Option<Address>,
    prepared: HashMap<Hash256, HashSet<Address>>,
    committed: HashMap<Hash256, HashSet<Address>>,
}

impl PracticalByzantineFaultTolerance {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_validator(&mut self, address: Address) {
        self.validators.insert(address);
        self.update_primary();
    }

    pub fn remove_validator(&mut self, address: &str) -> bool {
        let removed = self.validators.remove(address);
        if removed {
            self.update_primary();
        }
        removed
    }

    fn update_primary(&mut self) {
        if self.validators.is_empty() {
            self.primary = None;
            return;
        }
        let mut sorted: Vec<&Address> = self.validators.iter().collect();
        sorted.sort();
        let index = (self.current_view as usize) % sorted.len();
        self.primary = Some(sorted[index].clone());
    }

    #[must_use]
    pub fn primary(&self) -> Option<&Address> {
        self.primary.as_ref()
    }

    pub fn change_view(&mut self) {
        self.current_view += 1;
        self.update_primary();
        self.prepared.clear();
        self.committed.clear();
    }

    fn fault_tolerance(&self) -> usize {
        self.validators.len().saturating_sub(1) / 3
    }

    /// # Errors
    /// Returns an error if `validator_address` is not the current primary,
    /// or if there are fewer than [`MIN_VALIDATORS`] validators.
    pub fn pre_prepare(&self, validator_address: &str) -> Result<(), &'static str> {
        if self.primary.as_deref() != Some(validator_address) {
            return Err("only the primary can pre-prepare");
        }
        if self.validators.len() < MIN_VALIDATORS {
            return Err("not enough validators");
        }
        Ok(())
    }

    pub fn prepare(&mut self, block_hash: Hash256, validator_address: Address) -> bool {
        if !self.validators.contains(&validator_address) {
            return false;
        }
        self.prepared
            .entry(block_hash)
            .or_default()
            .insert(validator_address);
        true
    }

    fn is_prepared(&self, block_hash: &Hash256) -> bool {
        self.prepared
            .get(block_hash)
            .is_some_and(|set| set.len() >= 2 * self.fault_tolerance() + 1)
    }

    /// Records a commit message. Returns `false` if `block_hash` is not
    /// yet prepared or `validator_address` is unknown.
    pub fn commit(&mut self, block_hash: Hash256, validator_address: Address) -> bool {
        if !self.validators.contains(&validator_address) || !self.is_prepared(&block_hash) {
            return false;
        }
        self.committed
            .entry(block_hash)
            .or_default()
            .insert(validator_address);
        true
    }

    #[must_use]
    pub fn is_committed(&self, block_hash: &Hash256) -> bool {
        self.committed
            .get(block_hash)
            .is_some_and(|set| set.len() >= 2 * self.fault_tolerance() + 1)
    }
}

impl ConsensusEngine for PracticalByzantineFaultTolerance {
    fn validate_block(&self, block: &dyn ConsensusBlock, _producer: &Address) -> bool {
        self.is_committed(&block.claimed_hash())
    }

    fn name(&self) -> &'static str {
        "pbft"
    }
}
