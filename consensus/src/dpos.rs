//! Delegated proof of stake: token holders vote weight onto delegates;
//! the top `DELEGATE_COUNT` by accumulated weight rotate as producers.

use crate::engine::{ConsensusBlock, ConsensusEngine};
use shared::Address;
use std::collections::HashMap;

pub const DELEGATE_COUNT: usize = 21;

#[derive(Debug, Clone, Default)]
pub struct DelegatedProofOfStake {
    delegates: HashMap<Address, u64>,
    active_delegates: Vec<Address>,
    round: usize,
}

impl DelegatedProofOfStake {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `weight` to `delegate`'s vote total. Voter identity is not
    /// tracked and repeat votes are not deduplicated — this reproduces the
    /// reference's behavior rather than guessing a stricter policy (see
    /// SPEC_FULL §4.5, Open Question 1).
    pub fn vote(&mut self, delegate: Address, weight: u64) {
        *self.delegates.entry(delegate).or_insert(0) += weight;
        self.recompute_active_delegates();
    }

    fn recompute_active_delegates(&mut self) {
        let mut ranked: Vec<(&Address, &u64)> = self.delegates.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        self.active_delegates = ranked
            .into_iter()
            .take(DELEGATE_COUNT)
            .map(|(addr, _)| addr.clone())
            .collect();
    }

    #[must_use]
    pub fn active_delegates(&self) -> &[Address] {
        &self.active_delegates
    }

    pub fn get_next_delegate(&mut self) -> Option<Address> {
        if self.active_delegates.is_empty() {
            return None;
        }
        let delegate = self.active_delegates[self.round % self.active_delegates.len()].clone();
        self.round += 1;
        Some(delegate)
    }
}

impl ConsensusEngine for DelegatedProofOfStake {
    fn validate_block(&self, block: &dyn ConsensusBlock, producer: &Address) -> bool {
        self.active_delegates.contains(producer) && block.hash_is_intact()
    }

    fn name(&self) -> &'static str {
        "delegated-proof-of-stake"
    }
}
