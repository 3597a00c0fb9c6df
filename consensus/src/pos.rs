//! Proof of stake: a registry of staked validators, selected by a score
//! that mixes stake weight, elapsed time since the last block, and a
//! per-candidate seeded random draw.

use crate::engine::{ConsensusBlock, ConsensusEngine};
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::Address;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub const MIN_STAKE: u64 = 10;

#[derive(Debug, Clone)]
pub struct ProofOfStake {
    validators: HashMap<Address, u64>,
    last_block_time: f64,
}

impl Default for ProofOfStake {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofOfStake {
    #[must_use]
    pub fn new() -> Self {
        Self {
            validators: HashMap::new(),
            last_block_time: now_secs(),
        }
    }

    /// Registers `address` as a validator if `stake` meets [`MIN_STAKE`].
    pub fn register_validator(&mut self, address: Address, stake: u64) -> bool {
        if stake >= MIN_STAKE {
            self.validators.insert(address, stake);
            true
        } else {
            false
        }
    }

    pub fn remove_validator(&mut self, address: &str) -> bool {
        self.validators.remove(address).is_some()
    }

    #[must_use]
    pub fn is_registered(&self, address: &str) -> bool {
        self.validators.contains_key(address)
    }

    #[must_use]
    pub fn stake_of(&self, address: &str) -> Option<u64> {
        self.validators.get(address).copied()
    }

    /// All currently registered validator addresses, in no particular order.
    #[must_use]
    pub fn validator_addresses(&self) -> Vec<Address> {
        self.validators.keys().cloned().collect()
    }

    /// Draws the next validator. The per-candidate score reseeds a PRNG
    /// from the address and current time on every call — this reproduces
    /// the reference implementation's behavior faithfully rather than
    /// fixing it into a shared, reproducible stream (see SPEC_FULL §4.5).
    pub fn get_next_validator(&mut self) -> Option<Address> {
        if self.validators.is_empty() {
            return None;
        }

        let now = now_secs();
        let time_diff = now - self.last_block_time;
        let total_stake: u64 = self.validators.values().sum();

        let selected = self
            .validators
            .iter()
            .map(|(address, stake)| {
                let mut rng = StdRng::seed_from_u64(seed_for(address, now));
                let score =
                    (*stake as f64 / total_stake as f64) * rng.gen::<f64>() * time_diff.max(0.0);
                (address.clone(), score)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(address, _)| address);

        self.last_block_time = now;
        selected
    }
}

impl ConsensusEngine for ProofOfStake {
    fn validate_block(&self, block: &dyn ConsensusBlock, producer: &Address) -> bool {
        self.validators.contains_key(producer) && block.hash_is_intact()
    }

    fn name(&self) -> &'static str {
        "proof-of-stake"
    }
}

pub(crate) fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

pub(crate) fn seed_for(address: &str, now: f64) -> u64 {
    use shared::Hash256;
    let seed_input = format!("{address}{now}");
    let hash = Hash256::sha256(seed_input.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Hash256;

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
    fn rejects_stake_below_minimum() {
        let mut pos = ProofOfStake::new();
        assert!(!pos.register_validator("v1".to_string(), MIN_STAKE - 1));
        assert!(!pos.is_registered("v1"));
    }

    #[test]
    fn accepts_stake_at_minimum() {
        let mut pos = ProofOfStake::new();
        assert!(pos.register_validator("v1".to_string(), MIN_STAKE));
        assert!(pos.is_registered("v1"));
    }

    #[test]
    fn selection_always_returns_a_registered_validator() {
        let mut pos = ProofOfStake::new();
        pos.register_validator("v1".to_string(), 100);
        pos.register_validator("v2".to_string(), 200);
        pos.register_validator("v3".to_string(), 50);

        for _ in 0..20 {
            let selected = pos.get_next_validator().unwrap();
            assert!(["v1", "v2", "v3"].contains(&selected.as_str()));
        }
    }

    #[test]
    fn selection_frequency_tracks_stake_weight_over_many_draws() {
        let mut pos = ProofOfStake::new();
        pos.register_validator("v1".to_string(), 100);
        pos.register_validator("v2".to_string(), 200);
        pos.register_validator("v3".to_string(), 50);
        pos.register_validator("v4".to_string(), 150);

        let mut wins: HashMap<Address, u32> = HashMap::new();
        for _ in 0..3000 {
            let winner = pos.get_next_validator().unwrap();
            *wins.entry(winner).or_insert(0) += 1;
        }

        let count = |addr: &str| *wins.get(addr).unwrap_or(&0);
        assert!(count("v2") > count("v4"));
        assert!(count("v4") > count("v1"));
        assert!(count("v1") > count("v3"));
    }

    #[test]
    fn validate_block_requires_registration_and_intact_hash() {
        let mut pos = ProofOfStake::new();
        pos.register_validator("v1".to_string(), 100);
        let hash = Hash256::sha256(b"block body");

        assert!(pos.validate_block(&FakeBlock(hash), &"v1".to_string()));
        assert!(!pos.validate_block(&FakeBlock(hash), &"unregistered".to_string()));
    }
}
