use shared::{Address, Hash256};

/// The minimal view of a block every consensus strategy needs: its
/// claimed hash, and a way to recompute that hash from the header fields
/// that actually participate in it. Strategies that check block integrity
/// (most of the non-PoW families) compare the two.
pub trait ConsensusBlock {
    fn claimed_hash(&self) -> Hash256;
    fn recomputed_hash(&self) -> Hash256;

    fn hash_is_intact(&self) -> bool {
        self.claimed_hash() == self.recomputed_hash()
    }
}

/// Common surface every consensus family implements. Strategy-specific
/// operations (producer/validator/delegate selection, PBFT's message
/// phases, burn registration, shard assignment) live on the concrete
/// types; the blockchain only ever calls through this trait object.
pub trait ConsensusEngine: Send + Sync {
    /// Whether `block`, claimed to be produced by `producer`, is valid
    /// under this strategy's rules.
    fn validate_block(&self, block: &dyn ConsensusBlock, producer: &Address) -> bool;

    /// Human-readable name, used in logging and the persisted chain file's
    /// `consensus_type` field.
    fn name(&self) -> &'static str;
}
