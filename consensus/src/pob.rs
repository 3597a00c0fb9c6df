//! Proof of burn: validators earn weight by sending coins to an
//! unspendable address; burned amounts decay over time to simulate coin
//! aging.

use crate::engine::{ConsensusBlock, ConsensusEngine};
use crate::pos::{now_secs, seed_for};
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::Address;
use std::collections::HashMap;

pub const MIN_BURN_AMOUNT: u64 = 10;
pub const BURN_DECAY_FACTOR: f64 = 0.9;
const SECS_PER_DAY: f64 = 24.0 * 3600.0;

#[derive(Debug, Clone)]
pub struct ProofOfBurn {
    burned: HashMap<Address, f64>,
    last_update_time: f64,
}

impl Default for ProofOfBurn {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofOfBurn {
    #[must_use]
    pub fn new() -> Self {
        Self {
            burned: HashMap::new(),
            last_update_time: now_secs(),
        }
    }

    /// Records `amount` as burned by `address`. Rejects amounts below
    /// [`MIN_BURN_AMOUNT`].
    pub fn burn_coins(&mut self, address: Address, amount: u64) -> bool {
        if amount < MIN_BURN_AMOUNT {
            return false;
        }
        self.apply_decay();
        *self.burned.entry(address).or_insert(0.0) += amount as f64;
        true
    }

    fn apply_decay(&mut self) {
        let now = now_secs();
        let days = (now - self.last_update_time) / SECS_PER_DAY;
        if days > 0.0 {
            let decay = BURN_DECAY_FACTOR.powf(days);
            for value in self.burned.values_mut() {
                *value *= decay;
            }
            self.last_update_time = now;
        }
    }

    #[must_use]
    pub fn burned_amount(&self, address: &str) -> Option<f64> {
        self.burned.get(address).copied()
    }

    pub fn get_next_validator(&mut self) -> Option<Address> {
        if self.burned.is_empty() {
            return None;
        }
        self.apply_decay();
        let total: f64 = self.burned.values().sum();
        let now = now_secs();

        self.burned
            .iter()
            .map(|(address, burned)| {
                let mut rng = StdRng::seed_from_u64(seed_for(address, now));
                let score = (burned / total) * rng.gen::<f64>();
                (address.clone(), score)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(address, _)| address)
    }
}

impl ConsensusEngine for ProofOfBurn {
    fn validate_block(&self, block: &dyn ConsensusBlock, producer: &Address) -> bool {
        self.burned
            .get(producer)
            .is_some_and(|amount| *amount >= MIN_BURN_AMOUNT as f64)
            && block.hash_is_intact()
    }

    fn name(&self) -> &'static str {
        "proof-of-burn"
    }
}
