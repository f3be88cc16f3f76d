//! Typed ledgers over [`VersionedRecordStore`].

use crate::{
    state::State,
    store::{Record, RecordKey, VersionedRecordStore},
    StoreError,
};
use peerless_types::betting::{
    ChainGamesRecord, EventRecord, MappingKind, MappingRecord, ResultRecord,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

impl Record for MappingRecord {
    fn key(&self) -> RecordKey {
        RecordKey::new(self.kind as u8, self.id)
    }

    fn is_well_formed(&self) -> bool {
        MappingRecord::is_well_formed(self)
    }
}

impl Record for EventRecord {
    fn key(&self) -> RecordKey {
        RecordKey::new(0, self.id)
    }
}

impl Record for ResultRecord {
    fn key(&self) -> RecordKey {
        RecordKey::new(0, self.event_id)
    }
}

impl Record for ChainGamesRecord {
    fn key(&self) -> RecordKey {
        RecordKey::new(0, self.id)
    }
}

/// A single-purpose record ledger.
pub struct Ledger<S: State, R: Record> {
    name: &'static str,
    store: VersionedRecordStore<S, R>,
}

pub type MappingLedger<S> = Ledger<S, MappingRecord>;
pub type EventLedger<S> = Ledger<S, EventRecord>;
pub type ResultLedger<S> = Ledger<S, ResultRecord>;
pub type ChainGamesLedger<S> = Ledger<S, ChainGamesRecord>;

impl<S: State, R: Record> Ledger<S, R> {
    pub fn open(name: &'static str, state: S, depth: u64) -> Result<Self, StoreError> {
        Ok(Self {
            name,
            store: VersionedRecordStore::open(state, depth)?,
        })
    }

    /// Saves `record` at `height`. Returns `false`, with no state change, if the
    /// record is malformed.
    pub fn save(&self, record: R, height: u64) -> Result<bool, StoreError> {
        if !record.is_well_formed() {
            debug!(ledger = self.name, height, "refused malformed record");
            return Ok(false);
        }
        self.store.save(record, height)?;
        Ok(true)
    }

    pub fn rollback_to(&self, height: u64) -> Result<(), StoreError> {
        self.store.rollback_to(height)
    }

    pub fn ensure_rollback(&self, height: u64) -> Result<(), StoreError> {
        self.store.ensure_rollback(height)
    }

    pub fn tip(&self) -> Result<Option<u64>, StoreError> {
        self.store.tip()
    }

    pub fn advance(&self, height: u64) -> Result<(), StoreError> {
        self.store.advance(height)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.clear()
    }
}

macro_rules! single_kind_ledger {
    ($record:ty) => {
        impl<S: State> Ledger<S, $record> {
            /// Index by id as of `height`, or `None` outside the retained window.
            pub fn read(&self, height: u64) -> Result<Option<BTreeMap<u32, $record>>, StoreError> {
                self.store.read(None, height)
            }

            /// Like `read`, but a ledger that was never written answers with an empty index.
            pub fn snapshot(
                &self,
                height: u64,
            ) -> Result<Option<BTreeMap<u32, $record>>, StoreError> {
                if self.store.tip()?.is_none() {
                    return Ok(Some(BTreeMap::new()));
                }
                self.store.read(None, height)
            }

            /// Value of `id` at the tip.
            pub fn current(&self, id: u32) -> Result<Option<$record>, StoreError> {
                self.store.latest(RecordKey::new(0, id))
            }
        }
    };
}

single_kind_ledger!(EventRecord);
single_kind_ledger!(ResultRecord);
single_kind_ledger!(ChainGamesRecord);

impl<S: State> Ledger<S, MappingRecord> {
    /// Mappings of `kind` as of `height`, or `None` outside the retained window.
    pub fn read(
        &self,
        kind: MappingKind,
        height: u64,
    ) -> Result<Option<BTreeMap<u32, MappingRecord>>, StoreError> {
        self.store.read(Some(kind as u8), height)
    }

    pub fn current(&self, kind: MappingKind, id: u32) -> Result<Option<MappingRecord>, StoreError> {
        self.store.latest(RecordKey::new(kind as u8, id))
    }
}

/// One storage engine per ledger, as handed to [`Ledgers::open`].
pub struct Databases<S> {
    pub mappings: S,
    pub events: S,
    pub results: S,
    pub chain_games: S,
}

/// Every ledger the chain state drives, sharing one rollback depth.
pub struct Ledgers<S: State> {
    pub mappings: MappingLedger<S>,
    pub events: EventLedger<S>,
    pub results: ResultLedger<S>,
    pub chain_games: ChainGamesLedger<S>,
}

impl<S: State> Ledgers<S> {
    pub fn open(databases: Databases<S>, depth: u64) -> Result<Self, StoreError> {
        Ok(Self {
            mappings: Ledger::open("mappings", databases.mappings, depth)?,
            events: Ledger::open("events", databases.events, depth)?,
            results: Ledger::open("results", databases.results, depth)?,
            chain_games: Ledger::open("chain_games", databases.chain_games, depth)?,
        })
    }

    /// Rolls every ledger back to `height`.
    ///
    /// Refuses up front, touching nothing, if any ledger already folded that height away.
    pub fn rollback_to(&self, height: u64) -> Result<(), StoreError> {
        self.mappings.ensure_rollback(height)?;
        self.events.ensure_rollback(height)?;
        self.results.ensure_rollback(height)?;
        self.chain_games.ensure_rollback(height)?;
        self.mappings.rollback_to(height)?;
        self.events.rollback_to(height)?;
        self.results.rollback_to(height)?;
        self.chain_games.rollback_to(height)
    }

    /// Marks `height` as fully applied by moving every ledger's tip to it.
    pub fn commit(&self, height: u64) -> Result<(), StoreError> {
        self.mappings.advance(height)?;
        self.events.advance(height)?;
        self.results.advance(height)?;
        self.chain_games.advance(height)?;
        debug!(height, "committed ledgers");
        Ok(())
    }

    /// Returns the last height every ledger committed, first undoing writes from a block
    /// that was cut short.
    ///
    /// Ledgers that are ahead of the others are rolled back to the lowest tip. If some ledger
    /// was never written, the first block never committed and every ledger is cleared.
    pub fn recover(&self) -> Result<Option<u64>, StoreError> {
        let tips = [
            self.mappings.tip()?,
            self.events.tip()?,
            self.results.tip()?,
            self.chain_games.tip()?,
        ];
        let Some(highest) = tips.iter().flatten().max().copied() else {
            return Ok(None);
        };
        let Some(committed) = tips.iter().copied().min().flatten() else {
            warn!(highest, "first block never committed; clearing ledgers");
            self.mappings.clear()?;
            self.events.clear()?;
            self.results.clear()?;
            self.chain_games.clear()?;
            return Ok(None);
        };
        if committed < highest {
            warn!(committed, highest, "discarding partially applied block");
            self.rollback_to(committed)?;
        }
        Ok(Some(committed))
    }
}

#[cfg(any(test, feature = "mocks"))]
impl Databases<crate::state::Memory> {
    pub fn memory() -> Self {
        Self {
            mappings: Default::default(),
            events: Default::default(),
            results: Default::default(),
            chain_games: Default::default(),
        }
    }
}
