//! Sports-betting domain types.
//!
//! Defines oracle messages and their op-code codec, the records the execution
//! layer versions by height, and the payout values it derives from them.

mod codec;
mod constants;
mod kinds;
mod messages;
mod payout;
mod records;

pub use codec::{read_string, string_encode_size, write_string};
pub use constants::*;
pub use kinds::*;
pub use messages::*;
pub use payout::*;
pub use records::*;

#[cfg(test)]
mod tests;
