//! Common types used throughout peerless.

pub mod betting;
pub mod chain;

pub use betting::{CodecError, Envelope, Message};
pub use chain::{Block, Script, Transaction, TxOut};
