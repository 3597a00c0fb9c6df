use thiserror::Error;

/// Consensus-specific failures, layered over the shared error type the
/// way the ledger crate's own error module layers over `shared`'s.
#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("producer not registered")]
    ProducerNotRegistered,

    #[error("producer is not the primary for the current view")]
    NotPrimary,

    #[error("not enough validators: need at least {min}, have {actual}")]
    NotEnoughValidators { min: usize, actual: usize },

    #[error("block hash is not yet prepared")]
    NotPrepared,

    #[error("stake below minimum: required {min}, got {actual}")]
    StakeBelowMinimum { min: u64, actual: u64 },

    #[error("burn amount below minimum: required {min}, got {actual}")]
    BurnBelowMinimum { min: u64, actual: u64 },

    #[error("shard id {shard_id} out of range (0..{shard_count})")]
    ShardOutOfRange { shard_id: usize, shard_count: usize },

    #[error("block time has not yet elapsed")]
    BlockTimeNotElapsed,

    #[error(transparent)]
    Shared(#[from] shared::BlockchainError),
}

pub type Result<T> = std::result::Result<T, ConsensusError>;
