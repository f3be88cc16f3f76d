use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};

/// Outcome a bettor can back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum OutcomeType {
    MoneyLineWin = 0x01,
    MoneyLineLose = 0x02,
    MoneyLineDraw = 0x03,
    SpreadHome = 0x04,
    SpreadAway = 0x05,
    TotalOver = 0x06,
    TotalUnder = 0x07,
}

impl OutcomeType {
    pub const ALL: [OutcomeType; 7] = [
        Self::MoneyLineWin,
        Self::MoneyLineLose,
        Self::MoneyLineDraw,
        Self::SpreadHome,
        Self::SpreadAway,
        Self::TotalOver,
        Self::TotalUnder,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::MoneyLineWin),
            0x02 => Some(Self::MoneyLineLose),
            0x03 => Some(Self::MoneyLineDraw),
            0x04 => Some(Self::SpreadHome),
            0x05 => Some(Self::SpreadAway),
            0x06 => Some(Self::TotalOver),
            0x07 => Some(Self::TotalUnder),
            _ => None,
        }
    }

    pub fn is_moneyline(self) -> bool {
        matches!(
            self,
            Self::MoneyLineWin | Self::MoneyLineLose | Self::MoneyLineDraw
        )
    }

    pub fn is_spread(self) -> bool {
        matches!(self, Self::SpreadHome | Self::SpreadAway)
    }

    pub fn is_totals(self) -> bool {
        matches!(self, Self::TotalOver | Self::TotalUnder)
    }
}

impl Write for OutcomeType {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for OutcomeType {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        Self::from_u8(value).ok_or(Error::InvalidEnum(value))
    }
}

impl FixedSize for OutcomeType {
    const SIZE: usize = 1;
}

/// How the oracle resolved an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultType {
    Standard = 0x01,
    EventRefund = 0x02,
    MoneyLineRefund = 0x03,
    SpreadsRefund = 0x04,
    TotalsRefund = 0x05,
}

impl ResultType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Standard),
            0x02 => Some(Self::EventRefund),
            0x03 => Some(Self::MoneyLineRefund),
            0x04 => Some(Self::SpreadsRefund),
            0x05 => Some(Self::TotalsRefund),
            _ => None,
        }
    }

    pub fn is_refund(self) -> bool {
        !matches!(self, Self::Standard)
    }
}

impl Write for ResultType {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for ResultType {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        Self::from_u8(value).ok_or(Error::InvalidEnum(value))
    }
}

impl FixedSize for ResultType {
    const SIZE: usize = 1;
}

/// Side that won a market once scores (and handicaps) are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WinnerType {
    HomeWin = 0x01,
    AwayWin = 0x02,
    Push = 0x03,
}

impl WinnerType {
    /// Compares two (possibly handicapped) scores.
    pub fn from_scores(home: u64, away: u64) -> Self {
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => Self::HomeWin,
            std::cmp::Ordering::Less => Self::AwayWin,
            std::cmp::Ordering::Equal => Self::Push,
        }
    }
}

/// Namespace of a reference-data mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum MappingKind {
    Sport = 0x01,
    Round = 0x02,
    Team = 0x03,
    Tournament = 0x04,
}

impl MappingKind {
    pub const ALL: [MappingKind; 4] = [Self::Sport, Self::Round, Self::Team, Self::Tournament];

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Sport),
            0x02 => Some(Self::Round),
            0x03 => Some(Self::Team),
            0x04 => Some(Self::Tournament),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sport => "sports",
            Self::Round => "rounds",
            Self::Team => "teams",
            Self::Tournament => "tournaments",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl Write for MappingKind {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for MappingKind {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        Self::from_u8(value).ok_or(Error::InvalidEnum(value))
    }
}

impl FixedSize for MappingKind {
    const SIZE: usize = 1;
}

/// Op-code message type tag (third byte of every payload).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Mapping = 0x01,
    Event = 0x02,
    Bet = 0x03,
    Result = 0x04,
    UpdateOdds = 0x05,
    ChainGamesEvent = 0x06,
    ChainGamesBet = 0x07,
    ChainGamesResult = 0x08,
    SpreadsEvent = 0x09,
    TotalsEvent = 0x0a,
    EventPatch = 0x0b,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Mapping),
            0x02 => Some(Self::Event),
            0x03 => Some(Self::Bet),
            0x04 => Some(Self::Result),
            0x05 => Some(Self::UpdateOdds),
            0x06 => Some(Self::ChainGamesEvent),
            0x07 => Some(Self::ChainGamesBet),
            0x08 => Some(Self::ChainGamesResult),
            0x09 => Some(Self::SpreadsEvent),
            0x0a => Some(Self::TotalsEvent),
            0x0b => Some(Self::EventPatch),
            _ => None,
        }
    }

    /// Bets are open to anyone; every other kind must come from the oracle.
    pub fn requires_oracle(self) -> bool {
        !self.is_bet()
    }

    pub fn is_bet(self) -> bool {
        matches!(self, Self::Bet | Self::ChainGamesBet)
    }
}
