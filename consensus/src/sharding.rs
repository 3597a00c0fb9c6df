//! Sharded proof of stake: validators are partitioned into `shard_count`
//! independent stake registries plus one global registry used for
//! cross-shard traffic and validator lookups that don't name a shard.

use crate::engine::{ConsensusBlock, ConsensusEngine};
use crate::pos::ProofOfStake;
use shared::{Address, Hash256};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ShardingConsensus {
    shard_count: u32,
    shards: Vec<ProofOfStake>,
    global: ProofOfStake,
    validator_to_shard: HashMap<Address, u32>,
}

impl ShardingConsensus {
    /// # Panics
    /// Panics if `shard_count` is zero.
    #[must_use]
    pub fn new(shard_count: u32) -> Self {
        assert!(shard_count > 0, "shard_count must be positive");
        Self {
            shard_count,
            shards: (0..shard_count).map(|_| ProofOfStake::new()).collect(),
            global: ProofOfStake::new(),
            validator_to_shard: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn shard_count(&self) -> u32 {
        self.shard_count
    }

    #[must_use]
    pub fn shard_of(&self, address: &str) -> Option<u32> {
        self.validator_to_shard.get(address).copied()
    }

    /// Registers `address` on `shard_id`, or on the least-populated shard
    /// when no shard is requested. Registers in both the shard-local and
    /// the global registry.
    pub fn assign_validator(
        &mut self,
        address: Address,
        stake: u64,
        shard_id: Option<u32>,
    ) -> bool {
        let shard_id = shard_id.unwrap_or_else(|| self.least_populated_shard());
        let Some(shard) = self.shards.get_mut(shard_id as usize) else {
            return false;
        };
        let registered = shard.register_validator(address.clone(), stake);
        if registered {
            self.global.register_validator(address.clone(), stake);
            self.validator_to_shard.insert(address, shard_id);
        }
        registered
    }

    fn least_populated_shard(&self) -> u32 {
        self.shards
            .iter()
            .enumerate()
            .min_by_key(|(_, shard)| shard.validator_addresses().len())
            .map(|(index, _)| index as u32)
            .unwrap_or(0)
    }

    /// Assigns a transaction to a shard, hashing the sender address; falls
    /// back to the recipient, then to shard 0, when neither is given.
    #[must_use]
    pub fn get_shard_for_transaction(&self, sender: Option<&str>, recipient: Option<&str>) -> u32 {
        match sender.or(recipient) {
            Some(address) => shard_index(address, self.shard_count),
            None => 0,
        }
    }

    fn shard(&self, shard_id: u32) -> Option<&ProofOfStake> {
        self.shards.get(shard_id as usize)
    }

    /// Validates `block` against `producer`. When `shard_id` is given, the
    /// producer's recorded home shard must match it and that shard's
    /// registry must accept the block; otherwise the global registry is
    /// consulted.
    #[must_use]
    pub fn validate_block_in_shard(
        &self,
        block: &dyn ConsensusBlock,
        producer: &Address,
        shard_id: Option<u32>,
    ) -> bool {
        match shard_id {
            Some(shard_id) => {
                self.shard_of(producer) == Some(shard_id)
                    && self
                        .shard(shard_id)
                        .is_some_and(|shard| shard.validate_block(block, producer))
            }
            None => self.global.validate_block(block, producer),
        }
    }
}

fn shard_index(address: &str, shard_count: u32) -> u32 {
    let hash = Hash256::sha256(address.as_bytes());
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&hash.as_bytes()[0..4]);
    u32::from_be_bytes(bytes) % shard_count
}

impl ConsensusEngine for ShardingConsensus {
    /// The trait-object path validates against the global registry; callers
    /// that know the producer's shard should prefer
    /// [`validate_block_in_shard`].
    fn validate_block(&self, block: &dyn ConsensusBlock, producer: &Address) -> bool {
        self.validate_block_in_shard(block, producer, None)
    }

    fn name(&self) -> &'static str {
        "sharded-proof-of-stake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeBlock(Hash256);
    impl ConsensusBlock for FakeBlock {
        fn claimed_hash(&self) -> Hash256 {
            self.0
        }
        fn recomputed_hash(&self) -> Hash256 {
            self.0
        }
    }

    #[test]
    fn assigns_to_least_populated_shard_by_default() {
        let mut sharding = ShardingConsensus::new(2);
        sharding.assign_validator("a".to_string(), 100, Some(0));
        assert!(sharding.assign_validator("b".to_string(), 100, None));
        assert_eq!(sharding.shard_of("b"), Some(1));
    }

    #[test]
    fn transaction_shard_assignment_is_deterministic() {
        let sharding = ShardingConsensus::new(4);
        let first = sharding.get_shard_for_transaction(Some("alice"), None);
        let second = sharding.get_shard_for_transaction(Some("alice"), None);
        assert_eq!(first, second);
        assert!(first < 4);
    }

    #[test]
    fn transaction_shard_assignment_falls_back_to_recipient_then_zero() {
        let sharding = ShardingConsensus::new(4);
        assert_eq!(
            sharding.get_shard_for_transaction(None, Some("bob")),
            shard_index("bob", 4)
        );
        assert_eq!(sharding.get_shard_for_transaction(None, None), 0);
    }

    #[test]
    fn validate_block_in_shard_requires_matching_home_shard() {
        let mut sharding = ShardingConsensus::new(2);
        sharding.assign_validator("a".to_string(), 100, Some(0));
        let hash = Hash256::sha256(b"block body");

        assert!(sharding.validate_block_in_shard(&FakeBlock(hash), &"a".to_string(), Some(0)));
        assert!(!sharding.validate_block_in_shard(&FakeBlock(hash), &"a".to_string(), Some(1)));
    }

    #[test]
    fn validate_block_without_shard_id_uses_global_registry() {
        let mut sharding = ShardingConsensus::new(2);
        sharding.assign_validator("a".to_string(), 100, Some(0));
        let hash = Hash256::sha256(b"block body");

        assert!(sharding.validate_block(&FakeBlock(hash), &"a".to_string()));
        assert!(!sharding.validate_block(&FakeBlock(hash), &"z".to_string()));
    }
}
