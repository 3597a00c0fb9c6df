//! Pluggable consensus strategies for the ledger: proof of work, proof of
//! stake, delegated proof of stake, practical Byzantine fault tolerance,
//! proof of authority, proof of burn, a PoW/PoS hybrid, and a sharded
//! variant. All eight share one trait object surface ([`ConsensusEngine`])
//! so the blockchain can hold exactly one boxed strategy for its lifetime
//! and never dispatch on a string tag.

pub mod dpos;
pub mod engine;
pub mod error;
pub mod hybrid;
pub mod pbft;
pub mod poa;
pub mod pob;
pub mod pos;
pub mod pow;
pub mod sharding;

pub use dpos::DelegatedProofOfStake;
pub use engine::{ConsensusBlock, ConsensusEngine};
pub use error::{ConsensusError, Result};
pub use hybrid::HybridConsensus;
pub use pbft::PracticalByzantineFaultTolerance;
pub use poa::ProofOfAuthority;
pub use pob::ProofOfBurn;
pub use pos::ProofOfStake;
pub use pow::ProofOfWork;
pub use sharding::ShardingConsensus;

/// Identifies which strategy a boxed [`ConsensusEngine`] implements,
/// persisted as the chain file's `consensus_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ConsensusKind {
    ProofOfWork,
    ProofOfStake,
    DelegatedProofOfStake,
    Pbft,
    ProofOfAuthority,
    ProofOfBurn,
    Hybrid,
    Sharding,
}

impl ConsensusKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProofOfWork => "proof-of-work",
            Self::ProofOfStake => "proof-of-stake",
            Self::DelegatedProofOfStake => "delegated-proof-of-stake",
            Self::Pbft => "pbft",
            Self::ProofOfAuthority => "proof-of-authority",
            Self::ProofOfBurn => "proof-of-burn",
            Self::Hybrid => "hybrid-pow-pos",
            Self::Sharding => "sharded-proof-of-stake",
        }
    }
}
