use peerless_types::{betting::MessageType, CodecError, TxOut};
use thiserror::Error;

/// Failure of a [`crate::VersionedRecordStore`] operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage engine failure: {0:#}")]
    Storage(#[from] anyhow::Error),
    #[error("corrupt entry in storage: {0}")]
    Corrupt(#[from] commonware_codec::Error),
    #[error("height {height} is below the retained window (earliest {earliest})")]
    BelowWindow { height: u64, earliest: u64 },
    #[error("store lock poisoned")]
    Poisoned,
}

/// Why a single betting message was skipped. Never fatal to the block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("malformed message: {0}")]
    Malformed(#[from] CodecError),
    #[error("{kind:?} requires an authorized oracle sender")]
    UnauthorizedSender { kind: MessageType },
    #[error("event {event_id} does not exist")]
    InvalidReference { event_id: u32 },
    #[error("event {event_id} is already settled")]
    EventSettled { event_id: u32 },
    #[error("record failed validation")]
    MalformedRecord,
    #[error("stake {got} does not match entry fee {expected}")]
    StakeMismatch { expected: u64, got: u64 },
}

/// A block's payout outputs disagree with the expected set.
#[derive(Debug, Error, Clone, Default, PartialEq, Eq)]
#[error("payout mismatch: {} missing, {} unexpected", missing.len(), unexpected.len())]
pub struct PayoutMismatch {
    pub missing: Vec<TxOut>,
    pub unexpected: Vec<TxOut>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no authoritative state at height {height}")]
    NotFound { height: u64 },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("blockchain collaborator failed: {0:#}")]
    Collaborator(anyhow::Error),
    #[error(transparent)]
    PayoutMismatch(#[from] PayoutMismatch),
    #[error("expected height {expected}, got {got}")]
    HeightGap { expected: u64, got: u64 },
    #[error("chain state halted after a storage failure")]
    Halted,
}

impl Error {
    /// Storage failures leave derived state unknown; nothing may be processed after one.
    /// A rollback deeper than the retained window is refused before any write and is not fatal.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Store(StoreError::BelowWindow { .. }) => false,
            Error::Store(_) | Error::Halted => true,
            _ => false,
        }
    }
}
