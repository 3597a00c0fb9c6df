//! Hybrid proof of work / proof of stake: a block must clear a reduced
//! difficulty threshold and its producer must be a registered stake
//! validator.

use crate::engine::{ConsensusBlock, ConsensusEngine};
use crate::pos::ProofOfStake;
use crate::pow::ProofOfWork;
use shared::Address;

pub const POW_WEIGHT: f64 = 0.3;
pub const POS_WEIGHT: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct HybridConsensus {
    pow: ProofOfWork,
    pos: ProofOfStake,
    pow_weight: f64,
    pos_weight: f64,
}

impl HybridConsensus {
    /// Builds a hybrid engine from a reduced-difficulty PoW check and a
    /// PoS validator registry. `pow_weight`/`pos_weight` mirror the
    /// reference's scoring fields; neither contributes to
    /// `validate_block` there, so they are carried but unused here too.
    #[must_use]
    pub fn new(pow_difficulty: u32) -> Self {
        Self {
            pow: ProofOfWork::new(pow_difficulty),
            pos: ProofOfStake::new(),
            pow_weight: POW_WEIGHT,
            pos_weight: POS_WEIGHT,
        }
    }

    #[must_use]
    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn pow_mut(&mut self) -> &mut ProofOfWork {
        &mut self.pow
    }

    #[must_use]
    pub fn pos(&self) -> &ProofOfStake {
        &self.pos
    }

    pub fn pos_mut(&mut self) -> &mut ProofOfStake {
        &mut self.pos
    }

    #[must_use]
    pub fn weights(&self) -> (f64, f64) {
        (self.pow_weight, self.pos_weight)
    }
}

impl ConsensusEngine for HybridConsensus {
    fn validate_block(&self, block: &dyn ConsensusBlock, producer: &Address) -> bool {
        block.recomputed_hash().meets_difficulty(self.pow.difficulty())
            && self.pos.validate_block(block, producer)
    }

    fn name(&self) -> &'static str {
        "hybrid-pow-pos"
    }
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

    fn hex64(prefix: &str) -> String {
        format!("{prefix}{}", "0".repeat(64 - prefix.len()))
    }

    #[test]
    fn requires_both_difficulty_and_stake_registration() {
        let mut hybrid = HybridConsensus::new(2);
        hybrid.pos_mut().register_validator("v1".to_string(), 100);

        let easy_hash = Hash256::try_from(hex64("00").as_str()).unwrap();
        assert!(hybrid.validate_block(&FakeBlock(easy_hash), &"v1".to_string()));

        let hard_hash = Hash256::try_from(hex64("ff").as_str()).unwrap();
        assert!(!hybrid.validate_block(&FakeBlock(hard_hash), &"v1".to_string()));

        assert!(!hybrid.validate_block(&FakeBlock(easy_hash), &"unregistered".to_string()));
    }

    #[test]
    fn weights_are_retained_from_construction() {
        let hybrid = HybridConsensus::new(1);
        assert_eq!(hybrid.weights(), (POW_WEIGHT, POS_WEIGHT));
    }
}
