//! Oracle and bettor messages carried in transaction payloads.
//!
//! Binary: `[0x42] [version:u8] [type:u8] [fields...]`, integers little-endian.

use super::{
    codec::{get_name, get_u32, get_u64, get_u8, put_name},
    records::{MappingRecord, MoneylineOdds, ResultRecord, SpreadMarket, TotalsMarket},
    MappingKind, MessageType, OutcomeType, ResultType, MESSAGE_VERSION, OPCODE_HEADER_LEN,
    OPCODE_PREFIX,
};
use bytes::{Buf, BufMut};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    Malformed(&'static str),
    #[error("unknown message type {0:#04x}")]
    UnknownMessageType(u8),
    #[error("version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u8, got: u8 },
    #[error("unsupported version {0} for encoding")]
    UnsupportedVersion(u8),
    #[error("mapping name too long: {len} > {max}")]
    NameTooLong { len: usize, max: usize },
}

/// Announces (or re-announces) an event with its moneyline odds.
/// Binary: [eventId:u32] [startTime:u64] [sport:u32] [tournament:u32] [stage:u32]
/// [homeTeam:u32] [awayTeam:u32] [homeOdds:u32] [awayOdds:u32] [drawOdds:u32]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventMessage {
    pub event_id: u32,
    pub start_time: u64,
    pub sport: u32,
    pub tournament: u32,
    pub stage: u32,
    pub home_team: u32,
    pub away_team: u32,
    pub moneyline: MoneylineOdds,
}

/// Binary: [eventId:u32] [outcome:u8]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BetMessage {
    pub event_id: u32,
    pub outcome: OutcomeType,
}

/// Binary: [eventId:u32] [homeOdds:u32] [awayOdds:u32] [drawOdds:u32]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateOddsMessage {
    pub event_id: u32,
    pub moneyline: MoneylineOdds,
}

/// Binary: [eventId:u32] [points:u32] [homeOdds:u32] [awayOdds:u32]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpreadsMessage {
    pub event_id: u32,
    pub market: SpreadMarket,
}

/// Binary: [eventId:u32] [points:u32] [overOdds:u32] [underOdds:u32]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TotalsMessage {
    pub event_id: u32,
    pub market: TotalsMarket,
}

/// Binary: [eventId:u32] [startTime:u64]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventPatchMessage {
    pub event_id: u32,
    pub start_time: u64,
}

/// Binary: [eventId:u32] [entryFee:u32] (fee in whole coins)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainGamesEventMessage {
    pub event_id: u32,
    pub entry_fee: u32,
}

/// Binary: [eventId:u32]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainGamesBetMessage {
    pub event_id: u32,
}

/// Binary: [eventId:u32]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainGamesResultMessage {
    pub event_id: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Binary: [kind:u8] [id:u32] [nameLen:u16] [nameBytes...]
    Mapping(MappingRecord),
    Event(EventMessage),
    Bet(BetMessage),
    /// Binary: [eventId:u32] [resultType:u8] [homeScore:u32] [awayScore:u32]
    Result(ResultRecord),
    UpdateOdds(UpdateOddsMessage),
    ChainGamesEvent(ChainGamesEventMessage),
    ChainGamesBet(ChainGamesBetMessage),
    ChainGamesResult(ChainGamesResultMessage),
    SpreadsEvent(SpreadsMessage),
    TotalsEvent(TotalsMessage),
    EventPatch(EventPatchMessage),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Mapping(_) => MessageType::Mapping,
            Self::Event(_) => MessageType::Event,
            Self::Bet(_) => MessageType::Bet,
            Self::Result(_) => MessageType::Result,
            Self::UpdateOdds(_) => MessageType::UpdateOdds,
            Self::ChainGamesEvent(_) => MessageType::ChainGamesEvent,
            Self::ChainGamesBet(_) => MessageType::ChainGamesBet,
            Self::ChainGamesResult(_) => MessageType::ChainGamesResult,
            Self::SpreadsEvent(_) => MessageType::SpreadsEvent,
            Self::TotalsEvent(_) => MessageType::TotalsEvent,
            Self::EventPatch(_) => MessageType::EventPatch,
        }
    }

    /// Encodes at the current protocol version.
    pub fn to_opcode(&self) -> Result<Vec<u8>, CodecError> {
        Envelope::new(self.clone()).to_opcode()
    }

    fn write_body(&self, writer: &mut impl BufMut) -> Result<(), CodecError> {
        match self {
            Self::Mapping(m) => {
                writer.put_u8(m.kind as u8);
                writer.put_u32_le(m.id);
                put_name(writer, &m.name)?;
            }
            Self::Event(m) => {
                writer.put_u32_le(m.event_id);
                writer.put_u64_le(m.start_time);
                writer.put_u32_le(m.sport);
                writer.put_u32_le(m.tournament);
                writer.put_u32_le(m.stage);
                writer.put_u32_le(m.home_team);
                writer.put_u32_le(m.away_team);
                put_moneyline(writer, &m.moneyline);
            }
            Self::Bet(m) => {
                writer.put_u32_le(m.event_id);
                writer.put_u8(m.outcome as u8);
            }
            Self::Result(m) => {
                writer.put_u32_le(m.event_id);
                writer.put_u8(m.result_type as u8);
                writer.put_u32_le(m.home_score);
                writer.put_u32_le(m.away_score);
            }
            Self::UpdateOdds(m) => {
                writer.put_u32_le(m.event_id);
                put_moneyline(writer, &m.moneyline);
            }
            Self::ChainGamesEvent(m) => {
                writer.put_u32_le(m.event_id);
                writer.put_u32_le(m.entry_fee);
            }
            Self::ChainGamesBet(m) => writer.put_u32_le(m.event_id),
            Self::ChainGamesResult(m) => writer.put_u32_le(m.event_id),
            Self::SpreadsEvent(m) => {
                writer.put_u32_le(m.event_id);
                writer.put_u32_le(m.market.points);
                writer.put_u32_le(m.market.home_odds);
                writer.put_u32_le(m.market.away_odds);
            }
            Self::TotalsEvent(m) => {
                writer.put_u32_le(m.event_id);
                writer.put_u32_le(m.market.points);
                writer.put_u32_le(m.market.over_odds);
                writer.put_u32_le(m.market.under_odds);
            }
            Self::EventPatch(m) => {
                writer.put_u32_le(m.event_id);
                writer.put_u64_le(m.start_time);
            }
        }
        Ok(())
    }

    fn read_body(kind: MessageType, reader: &mut impl Buf) -> Result<Self, CodecError> {
        Ok(match kind {
            MessageType::Mapping => {
                let tag = get_u8(reader, "mapping kind")?;
                let kind = MappingKind::from_u8(tag).ok_or(CodecError::Malformed("mapping kind"))?;
                Self::Mapping(MappingRecord {
                    kind,
                    id: get_u32(reader, "mapping id")?,
                    name: get_name(reader)?,
                })
            }
            MessageType::Event => Self::Event(EventMessage {
                event_id: get_u32(reader, "event id")?,
                start_time: get_u64(reader, "start time")?,
                sport: get_u32(reader, "sport")?,
                tournament: get_u32(reader, "tournament")?,
                stage: get_u32(reader, "stage")?,
                home_team: get_u32(reader, "home team")?,
                away_team: get_u32(reader, "away team")?,
                moneyline: get_moneyline(reader)?,
            }),
            MessageType::Bet => {
                let event_id = get_u32(reader, "event id")?;
                let outcome = get_u8(reader, "outcome")?;
                let outcome = OutcomeType::from_u8(outcome).ok_or(CodecError::Malformed("outcome"))?;
                Self::Bet(BetMessage { event_id, outcome })
            }
            MessageType::Result => {
                let event_id = get_u32(reader, "event id")?;
                let result_type = get_u8(reader, "result type")?;
                let result_type =
                    ResultType::from_u8(result_type).ok_or(CodecError::Malformed("result type"))?;
                Self::Result(ResultRecord {
                    event_id,
                    result_type,
                    home_score: get_u32(reader, "home score")?,
                    away_score: get_u32(reader, "away score")?,
                })
            }
            MessageType::UpdateOdds => Self::UpdateOdds(UpdateOddsMessage {
                event_id: get_u32(reader, "event id")?,
                moneyline: get_moneyline(reader)?,
            }),
            MessageType::ChainGamesEvent => Self::ChainGamesEvent(ChainGamesEventMessage {
                event_id: get_u32(reader, "event id")?,
                entry_fee: get_u32(reader, "entry fee")?,
            }),
            MessageType::ChainGamesBet => Self::ChainGamesBet(ChainGamesBetMessage {
                event_id: get_u32(reader, "event id")?,
            }),
            MessageType::ChainGamesResult => Self::ChainGamesResult(ChainGamesResultMessage {
                event_id: get_u32(reader, "event id")?,
            }),
            MessageType::SpreadsEvent => Self::SpreadsEvent(SpreadsMessage {
                event_id: get_u32(reader, "event id")?,
                market: SpreadMarket {
                    points: get_u32(reader, "spread points")?,
                    home_odds: get_u32(reader, "spread home odds")?,
                    away_odds: get_u32(reader, "spread away odds")?,
                },
            }),
            MessageType::TotalsEvent => Self::TotalsEvent(TotalsMessage {
                event_id: get_u32(reader, "event id")?,
                market: TotalsMarket {
                    points: get_u32(reader, "totals points")?,
                    over_odds: get_u32(reader, "over odds")?,
                    under_odds: get_u32(reader, "under odds")?,
                },
            }),
            MessageType::EventPatch => Self::EventPatch(EventPatchMessage {
                event_id: get_u32(reader, "event id")?,
                start_time: get_u64(reader, "start time")?,
            }),
        })
    }
}

fn put_moneyline(writer: &mut impl BufMut, odds: &MoneylineOdds) {
    writer.put_u32_le(odds.home);
    writer.put_u32_le(odds.away);
    writer.put_u32_le(odds.draw);
}

fn get_moneyline(reader: &mut impl Buf) -> Result<MoneylineOdds, CodecError> {
    Ok(MoneylineOdds {
        home: get_u32(reader, "home odds")?,
        away: get_u32(reader, "away odds")?,
        draw: get_u32(reader, "draw odds")?,
    })
}

/// A message together with the protocol version it is framed with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub version: u8,
    pub message: Message,
}

impl Envelope {
    pub fn new(message: Message) -> Self {
        Self {
            version: MESSAGE_VERSION,
            message,
        }
    }

    pub fn to_opcode(&self) -> Result<Vec<u8>, CodecError> {
        if self.version != MESSAGE_VERSION {
            return Err(CodecError::UnsupportedVersion(self.version));
        }
        let mut payload = Vec::with_capacity(OPCODE_HEADER_LEN + 64);
        payload.put_u8(OPCODE_PREFIX);
        payload.put_u8(self.version);
        payload.put_u8(self.message.message_type() as u8);
        self.message.write_body(&mut payload)?;
        Ok(payload)
    }

    /// Parses a payload. Has no side effects; callers decide how to treat failures.
    pub fn from_opcode(payload: &[u8]) -> Result<Self, CodecError> {
        let mut reader = payload;
        let prefix = get_u8(&mut reader, "prefix")?;
        if prefix != OPCODE_PREFIX {
            return Err(CodecError::Malformed("prefix"));
        }
        let version = get_u8(&mut reader, "version")?;
        if version != MESSAGE_VERSION {
            return Err(CodecError::VersionMismatch {
                expected: MESSAGE_VERSION,
                got: version,
            });
        }
        let tag = get_u8(&mut reader, "message type")?;
        let kind = MessageType::from_u8(tag).ok_or(CodecError::UnknownMessageType(tag))?;
        let message = Message::read_body(kind, &mut reader)?;
        if reader.has_remaining() {
            return Err(CodecError::Malformed("trailing bytes"));
        }
        Ok(Self { version, message })
    }
}

/// True if the payload claims to be a betting op-code. Anything else is not ours to judge.
pub fn is_betting_payload(payload: &[u8]) -> bool {
    payload.first() == Some(&OPCODE_PREFIX)
}

/// Message type tag of a betting payload, if the header is present.
pub fn peek_message_type(payload: &[u8]) -> Option<MessageType> {
    if !is_betting_payload(payload) || payload.len() < OPCODE_HEADER_LEN {
        return None;
    }
    MessageType::from_u8(payload[2])
}
