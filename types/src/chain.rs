//! Minimal view of the host chain: the parts of transactions and blocks that
//! betting state depends on.

use crate::betting::MAX_SCRIPT_LENGTH;
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::sha256::Digest;

/// Opaque locking script of an output.
pub type Script = Vec<u8>;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxOut {
    pub amount: u64,
    pub script: Script,
}

impl TxOut {
    pub fn new(amount: u64, script: impl Into<Script>) -> Self {
        Self {
            amount,
            script: script.into(),
        }
    }
}

impl Write for TxOut {
    fn write(&self, writer: &mut impl BufMut) {
        self.amount.write(writer);
        self.script.write(writer);
    }
}

impl Read for TxOut {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            amount: u64::read(reader)?,
            script: Vec::<u8>::read_range(reader, 0..=MAX_SCRIPT_LENGTH)?,
        })
    }
}

impl EncodeSize for TxOut {
    fn encode_size(&self) -> usize {
        self.amount.encode_size() + self.script.encode_size()
    }
}

/// A transaction that may carry a betting payload.
///
/// `sender` is the script that funded it (used for oracle authorization),
/// `value` the amount staked, `return_script` where winnings are sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub id: Digest,
    pub sender: Script,
    pub value: u64,
    pub payload: Vec<u8>,
    pub return_script: Script,
}

/// A block as seen by payout validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub height: u64,
    pub transactions: Vec<Transaction>,
    /// Outputs the block pays out on top of the regular reward.
    pub payouts: Vec<TxOut>,
}
