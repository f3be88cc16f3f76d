/// First byte of every betting op-code payload (ASCII `B`).
pub const OPCODE_PREFIX: u8 = 0x42;

/// Op-code protocol version understood by this crate.
pub const MESSAGE_VERSION: u8 = 0x01;

/// Prefix, version and message type.
pub const OPCODE_HEADER_LEN: usize = 3;

/// Maximum UTF-8 length of a mapping name.
pub const MAX_MAPPING_NAME_LENGTH: usize = 128;

/// Upper bound on stored output scripts.
pub const MAX_SCRIPT_LENGTH: usize = 10_000;

/// Base units per coin. Chain games entry fees are denominated in whole coins.
pub const COIN: u64 = 100_000_000;

/// Default fixed-point scale of oracle odds (15_000 is a 1.5x multiplier).
pub const DEFAULT_ODDS_DIVISOR: u32 = 10_000;

/// Default number of recent heights kept for rollback.
pub const DEFAULT_MAX_REORGANIZATION_DEPTH: u64 = 100;

/// Permille denominator used by reward policies.
pub const PERMILLE: u64 = 1_000;
