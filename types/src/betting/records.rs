use super::{
    codec::{read_string, string_encode_size, write_string},
    messages::EventMessage,
    MappingKind, OutcomeType, ResultType, MAX_MAPPING_NAME_LENGTH,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::sha256::Digest;

/// Reference-data name (sport, round, team or tournament) published by the oracle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappingRecord {
    pub kind: MappingKind,
    pub id: u32,
    pub name: String,
}

impl MappingRecord {
    pub fn new(kind: MappingKind, id: u32, name: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            name: name.into(),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        !self.name.is_empty() && self.name.len() <= MAX_MAPPING_NAME_LENGTH
    }
}

impl Write for MappingRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.kind.write(writer);
        self.id.write(writer);
        write_string(&self.name, writer);
    }
}

impl Read for MappingRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            kind: MappingKind::read(reader)?,
            id: u32::read(reader)?,
            name: read_string(reader, MAX_MAPPING_NAME_LENGTH)?,
        })
    }
}

impl EncodeSize for MappingRecord {
    fn encode_size(&self) -> usize {
        self.kind.encode_size() + self.id.encode_size() + string_encode_size(&self.name)
    }
}

/// Moneyline odds, scaled by the configured odds divisor. Zero closes the market.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoneylineOdds {
    pub home: u32,
    pub away: u32,
    pub draw: u32,
}

/// Home handicap market: home wins the spread when `home > away + points`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpreadMarket {
    pub points: u32,
    pub home_odds: u32,
    pub away_odds: u32,
}

/// Over/under market on the combined score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TotalsMarket {
    pub points: u32,
    pub over_odds: u32,
    pub under_odds: u32,
}

/// Running bet count and potential liability for one outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    pub bets: u32,
    pub liability: u64,
}

impl Write for OutcomeTally {
    fn write(&self, writer: &mut impl BufMut) {
        self.bets.write(writer);
        self.liability.write(writer);
    }
}

impl Read for OutcomeTally {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            bets: u32::read(reader)?,
            liability: u64::read(reader)?,
        })
    }
}

impl FixedSize for OutcomeTally {
    const SIZE: usize = u32::SIZE + u64::SIZE;
}

/// Three odds (or points plus two odds) share one layout on disk.
macro_rules! impl_triple_codec {
    ($ty:ident { $a:ident, $b:ident, $c:ident }) => {
        impl Write for $ty {
            fn write(&self, writer: &mut impl BufMut) {
                self.$a.write(writer);
                self.$b.write(writer);
                self.$c.write(writer);
            }
        }

        impl Read for $ty {
            type Cfg = ();

            fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
                Ok(Self {
                    $a: u32::read(reader)?,
                    $b: u32::read(reader)?,
                    $c: u32::read(reader)?,
                })
            }
        }

        impl FixedSize for $ty {
            const SIZE: usize = 3 * u32::SIZE;
        }
    };
}

impl_triple_codec!(MoneylineOdds { home, away, draw });
impl_triple_codec!(SpreadMarket { points, home_odds, away_odds });
impl_triple_codec!(TotalsMarket { points, over_odds, under_odds });

/// Per-outcome tallies, indexed by [`OutcomeType`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutcomeTallies([OutcomeTally; 7]);

impl OutcomeTallies {
    fn index(outcome: OutcomeType) -> usize {
        outcome as usize - 1
    }

    pub fn get(&self, outcome: OutcomeType) -> &OutcomeTally {
        &self.0[Self::index(outcome)]
    }

    pub fn get_mut(&mut self, outcome: OutcomeType) -> &mut OutcomeTally {
        &mut self.0[Self::index(outcome)]
    }

    pub fn iter(&self) -> impl Iterator<Item = (OutcomeType, &OutcomeTally)> {
        OutcomeType::ALL.into_iter().zip(self.0.iter())
    }

    pub fn total_bets(&self) -> u64 {
        self.0.iter().map(|tally| tally.bets as u64).sum()
    }
}

impl Write for OutcomeTallies {
    fn write(&self, writer: &mut impl BufMut) {
        for tally in &self.0 {
            tally.write(writer);
        }
    }
}

impl Read for OutcomeTallies {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let mut tallies = [OutcomeTally::default(); 7];
        for tally in tallies.iter_mut() {
            *tally = OutcomeTally::read(reader)?;
        }
        Ok(Self(tallies))
    }
}

impl FixedSize for OutcomeTallies {
    const SIZE: usize = 7 * OutcomeTally::SIZE;
}

/// A sporting event with its current markets and accumulated liabilities.
///
/// Every mutation is stored as a new version keyed by the height of the message
/// that caused it, so the accumulators roll back with the rest of the record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventRecord {
    pub id: u32,
    pub start_time: u64,
    pub sport: u32,
    pub tournament: u32,
    pub stage: u32,
    pub home_team: u32,
    pub away_team: u32,
    pub moneyline: MoneylineOdds,
    pub spread: SpreadMarket,
    pub totals: TotalsMarket,
    pub tallies: OutcomeTallies,
}

impl EventRecord {
    /// Creates a fresh record from an announcement, with closed spread and totals markets.
    pub fn from_message(message: &EventMessage) -> Self {
        Self {
            id: message.event_id,
            start_time: message.start_time,
            sport: message.sport,
            tournament: message.tournament,
            stage: message.stage,
            home_team: message.home_team,
            away_team: message.away_team,
            moneyline: message.moneyline,
            ..Self::default()
        }
    }

    /// Applies a re-announcement: descriptive fields and moneyline odds are
    /// replaced, markets and accumulators carry over.
    pub fn reannounce(&self, message: &EventMessage) -> Self {
        Self {
            spread: self.spread,
            totals: self.totals,
            tallies: self.tallies,
            ..Self::from_message(message)
        }
    }

    /// Current odds quoted for `outcome`.
    pub fn odds(&self, outcome: OutcomeType) -> u32 {
        match outcome {
            OutcomeType::MoneyLineWin => self.moneyline.home,
            OutcomeType::MoneyLineLose => self.moneyline.away,
            OutcomeType::MoneyLineDraw => self.moneyline.draw,
            OutcomeType::SpreadHome => self.spread.home_odds,
            OutcomeType::SpreadAway => self.spread.away_odds,
            OutcomeType::TotalOver => self.totals.over_odds,
            OutcomeType::TotalUnder => self.totals.under_odds,
        }
    }

    /// Handicap points a bet on `outcome` is locked to (zero for moneyline).
    pub fn points(&self, outcome: OutcomeType) -> u32 {
        if outcome.is_spread() {
            self.spread.points
        } else if outcome.is_totals() {
            self.totals.points
        } else {
            0
        }
    }
}

impl Write for EventRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.start_time.write(writer);
        self.sport.write(writer);
        self.tournament.write(writer);
        self.stage.write(writer);
        self.home_team.write(writer);
        self.away_team.write(writer);
        self.moneyline.write(writer);
        self.spread.write(writer);
        self.totals.write(writer);
        self.tallies.write(writer);
    }
}

impl Read for EventRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: u32::read(reader)?,
            start_time: u64::read(reader)?,
            sport: u32::read(reader)?,
            tournament: u32::read(reader)?,
            stage: u32::read(reader)?,
            home_team: u32::read(reader)?,
            away_team: u32::read(reader)?,
            moneyline: MoneylineOdds::read(reader)?,
            spread: SpreadMarket::read(reader)?,
            totals: TotalsMarket::read(reader)?,
            tallies: OutcomeTallies::read(reader)?,
        })
    }
}

impl FixedSize for EventRecord {
    const SIZE: usize = u32::SIZE
        + u64::SIZE
        + 5 * u32::SIZE
        + MoneylineOdds::SIZE
        + SpreadMarket::SIZE
        + TotalsMarket::SIZE
        + OutcomeTallies::SIZE;
}

/// Oracle-published outcome of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResultRecord {
    pub event_id: u32,
    pub result_type: ResultType,
    pub home_score: u32,
    pub away_score: u32,
}

impl Write for ResultRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.event_id.write(writer);
        self.result_type.write(writer);
        self.home_score.write(writer);
        self.away_score.write(writer);
    }
}

impl Read for ResultRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            event_id: u32::read(reader)?,
            result_type: ResultType::read(reader)?,
            home_score: u32::read(reader)?,
            away_score: u32::read(reader)?,
        })
    }
}

impl FixedSize for ResultRecord {
    const SIZE: usize = u32::SIZE + ResultType::SIZE + 2 * u32::SIZE;
}

/// Chain games lotto round. `result_seed` is the id of the transaction that closed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainGamesRecord {
    pub id: u32,
    pub entry_fee: u32,
    pub result_seed: Option<Digest>,
}

impl ChainGamesRecord {
    pub fn is_resolved(&self) -> bool {
        self.result_seed.is_some()
    }
}

impl Write for ChainGamesRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.entry_fee.write(writer);
        self.result_seed.write(writer);
    }
}

impl Read for ChainGamesRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: u32::read(reader)?,
            entry_fee: u32::read(reader)?,
            result_seed: Option::<Digest>::read(reader)?,
        })
    }
}

impl EncodeSize for ChainGamesRecord {
    fn encode_size(&self) -> usize {
        self.id.encode_size() + self.entry_fee.encode_size() + self.result_seed.encode_size()
    }
}
