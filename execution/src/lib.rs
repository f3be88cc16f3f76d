//! Peerless betting state.
//!
//! This crate keeps the reorg-aware ledgers an oracle-driven betting chain derives from its
//! blocks (mappings, events, results and chain games) and computes the payouts every block
//! must contain.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time or randomness; chain games draws derive from transaction ids.
//! - Avoid iteration order of hash-based collections influencing outputs.
//! - Payout arithmetic is integer only and saturates instead of wrapping.
//!
//! ## Storage / recovery invariants
//! Each ledger is a [`VersionedRecordStore`]: full history is kept for the last
//! `max_reorg_depth` heights and folded into a base index below that. Rolling back within the
//! window restores exactly the state the ledger had at the target height.
//!
//! The primary entrypoint is [`ChainState`].
//!
//! ## Minimal pipeline (example)
//! ```rust,ignore
//! use peerless_execution::{mocks::{create_chain_state, create_config, MockChain}, ChainState};
//!
//! let state = create_chain_state(create_config(10_000, 100));
//! let mut chain = MockChain::new();
//! // 1) Connect each block in height order.
//! chain.connect(&state, 1, vec![]);
//! // 2) Before accepting block 2, check it pays what results at height 1 owe.
//! let (total, payouts) = state.get_block_payouts(2, &chain)?;
//! // 3) On a reorg, roll back and reconnect the new branch.
//! state.disconnect_to(0)?;
//! ```

pub mod chain_state;
pub mod config;
pub mod ledger;
pub mod liability;
pub mod payout;
pub mod store;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

mod error;
mod state;

#[cfg(test)]
mod payout_tests;

pub use chain_state::{BlockReceipt, Blockchain, ChainState};
pub use config::{Config, ConfigError, PayoutPolicy, ValidatedConfig};
pub use error::{Error, PayoutMismatch, Rejection, StoreError};
pub use ledger::{Databases, Ledger, Ledgers};
pub use payout::{
    is_block_payouts_valid, payouts_digest, settle, validate_block_payouts, EventPhase,
    PayoutEngine, Settlement,
};
#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;
pub use state::{State, Status};
pub use store::{Record, RecordKey, VersionedRecordStore};
