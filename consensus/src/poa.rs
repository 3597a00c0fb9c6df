//! Proof of authority: a fixed set of authorities round-robins block
//! production, rate-limited to one slot per `BLOCK_TIME` seconds.

use crate::engine::{ConsensusBlock, ConsensusEngine};
use shared::Address;
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

pub const BLOCK_TIME_SECS: f64 = 15.0;

#[derive(Debug, Clone)]
pub struct ProofOfAuthority {
    authorities: HashSet<Address>,
    last_block_time: f64,
    next_index: usize,
}

impl Default for ProofOfAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofOfAuthority {
    #[must_use]
    pub fn new() -> Self {
        Self {
            authorities: HashSet::new(),
            last_block_time: now_secs(),
            next_index: 0,
        }
    }

    pub fn add_authority(&mut self, address: Address) {
        self.authorities.insert(address);
    }

    pub fn remove_authority(&mut self, address: &str) -> bool {
        self.authorities.remove(address)
    }

    /// Returns the next authority due, or `None` if `BLOCK_TIME_SECS`
    /// has not yet elapsed since the last rotation.
    pub fn get_next_authority(&mut self) -> Option<Address> {
        if self.authorities.is_empty() {
            return None;
        }
        let now = now_secs();
        if now - self.last_block_time < BLOCK_TIME_SECS {
            return None;
        }

        let mut sorted: Vec<&Address> = self.authorities.iter().collect();
        sorted.sort();
        let authority = sorted[self.next_index % sorted.len()].clone();
        self.next_index += 1;
        self.last_block_time = now;
        Some(authority)
    }
}

impl ConsensusEngine for ProofOfAuthority {
    /// Checks only that `producer` is a registered authority, not that it
    /// is the one whose slot was actually due. A stricter, slot-bound
    /// variant is a documented possibility, not implemented here, because
    /// it isn't what the reference implementation checks (SPEC_FULL §4.5,
    /// Open Question 3).
    fn validate_block(&self, block: &dyn ConsensusBlock, producer: &Address) -> bool {
        self.authorities.contains(producer) && block.hash_is_intact()
    }

    fn name(&self) -> &'static str {
        "proof-of-authority"
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
