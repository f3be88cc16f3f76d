use super::{OutcomeType, MAX_SCRIPT_LENGTH};
use crate::chain::{Script, TxOut};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};

/// Why an output is owed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PayoutKind {
    Winnings = 1,
    Refund = 2,
    ChainGamesPrize = 3,
    OracleReward = 4,
}

impl Write for PayoutKind {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for PayoutKind {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        match value {
            1 => Ok(Self::Winnings),
            2 => Ok(Self::Refund),
            3 => Ok(Self::ChainGamesPrize),
            4 => Ok(Self::OracleReward),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for PayoutKind {
    const SIZE: usize = 1;
}

/// An output a block settling bets must contain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedPayout {
    pub amount: u64,
    pub script: Script,
    pub original_bet_amount: u64,
    /// Zero for the oracle reward, which spans every settled event.
    pub event_id: u32,
    pub kind: PayoutKind,
}

impl ExpectedPayout {
    pub fn output(&self) -> TxOut {
        TxOut {
            amount: self.amount,
            script: self.script.clone(),
        }
    }
}

impl Write for ExpectedPayout {
    fn write(&self, writer: &mut impl BufMut) {
        self.amount.write(writer);
        self.script.write(writer);
        self.original_bet_amount.write(writer);
        self.event_id.write(writer);
        self.kind.write(writer);
    }
}

impl Read for ExpectedPayout {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            amount: u64::read(reader)?,
            script: Vec::<u8>::read_range(reader, 0..=MAX_SCRIPT_LENGTH)?,
            original_bet_amount: u64::read(reader)?,
            event_id: u32::read(reader)?,
            kind: PayoutKind::read(reader)?,
        })
    }
}

impl EncodeSize for ExpectedPayout {
    fn encode_size(&self) -> usize {
        self.amount.encode_size()
            + self.script.encode_size()
            + self.original_bet_amount.encode_size()
            + self.event_id.encode_size()
            + self.kind.encode_size()
    }
}

/// A bet accepted at `height`, with the odds and handicap it was struck at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockedBet {
    pub event_id: u32,
    pub outcome: OutcomeType,
    pub amount: u64,
    pub odds: u32,
    pub points: u32,
    pub script: Script,
    pub height: u64,
    pub tx_index: u32,
}

/// A paid entry into a chain games lotto round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainGamesEntry {
    pub event_id: u32,
    pub amount: u64,
    pub script: Script,
    pub height: u64,
    pub tx_index: u32,
}

/// A bet as carried by one transaction, before it is checked against the event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BetRecord {
    pub event_id: u32,
    pub outcome: OutcomeType,
    pub amount: u64,
    pub script: Script,
}
