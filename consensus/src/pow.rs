//! Proof of work: producer selection is whoever finds a nonce first: the
//! mining loop itself lives with the block type in the ledger crate since
//! it needs mutable access to the header's nonce. This strategy only
//! carries the difficulty and checks the resulting hash against it.

use crate::engine::{ConsensusBlock, ConsensusEngine};
use shared::Address;

#[derive(Debug, Clone)]
pub struct ProofOfWork {
    difficulty: u32,
}

impl ProofOfWork {
    #[must_use]
    pub const fn new(difficulty: u32) -> Self {
        Self { difficulty }
    }

    #[must_use]
    pub const fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: u32) {
        self.difficulty = difficulty;
    }
}

impl ConsensusEngine for ProofOfWork {
    fn validate_block(&self, block: &dyn ConsensusBlock, _producer: &Address) -> bool {
        block.claimed_hash().meets_difficulty(self.difficulty)
    }

    fn name(&self) -> &'static str {
        "proof-of-work"
    }
}
