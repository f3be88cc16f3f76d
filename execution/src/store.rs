//! Height-versioned record storage with bounded rollback.
//!
//! ## Layout
//! Each store owns one storage engine and keeps three kinds of entries:
//! - `[0x00]` meta: the tip (highest height saved and not rolled back) and the floor
//!   (highest height folded into the base table, if any).
//! - `[0x01][kind][id]` base: the latest value at or below the floor, with the height it was written.
//! - `[0x02][height][kind][id]` diff: a value written at `height` above the floor.
//!
//! Keys are big-endian so diffs iterate in height order. A diff is folded into the base
//! once it is `depth` heights below the tip. Reads between the window start and the tip
//! replay diffs over the base; reads at or above the tip are served from an in-memory index.

use crate::{
    state::{State, Status},
    StoreError,
};
use bytes::{Buf, BufMut};
use commonware_codec::{DecodeExt, Encode, EncodeSize, Error, Read, ReadExt, Write};
use std::{collections::BTreeMap, sync::RwLock};
use tracing::{debug, warn};

const META_KEY: &[u8] = &[0x00];
const BASE_PREFIX: u8 = 0x01;
const DIFF_PREFIX: u8 = 0x02;

const BASE_KEY_LEN: usize = 1 + 1 + 4;
const DIFF_KEY_LEN: usize = 1 + 8 + 1 + 4;

/// Identity of a record within a store. Single-kind stores use kind 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub kind: u8,
    pub id: u32,
}

impl RecordKey {
    pub fn new(kind: u8, id: u32) -> Self {
        Self { kind, id }
    }
}

/// A value that can be versioned by height.
pub trait Record: Clone + Write + EncodeSize + Read<Cfg = ()> {
    fn key(&self) -> RecordKey;

    /// Records failing this check are refused by the ledgers without touching storage.
    fn is_well_formed(&self) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Meta {
    tip: u64,
    floor: Option<u64>,
}

impl Write for Meta {
    fn write(&self, writer: &mut impl BufMut) {
        self.tip.write(writer);
        self.floor.write(writer);
    }
}

impl Read for Meta {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            tip: u64::read(reader)?,
            floor: Option::<u64>::read(reader)?,
        })
    }
}

impl EncodeSize for Meta {
    fn encode_size(&self) -> usize {
        self.tip.encode_size() + self.floor.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Version<R> {
    height: u64,
    value: R,
}

impl<R: Record> Write for Version<R> {
    fn write(&self, writer: &mut impl BufMut) {
        self.height.write(writer);
        self.value.write(writer);
    }
}

impl<R: Record> Read for Version<R> {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            height: u64::read(reader)?,
            value: R::read(reader)?,
        })
    }
}

impl<R: Record> EncodeSize for Version<R> {
    fn encode_size(&self) -> usize {
        self.height.encode_size() + self.value.encode_size()
    }
}

fn base_key(key: RecordKey) -> Vec<u8> {
    let mut raw = Vec::with_capacity(BASE_KEY_LEN);
    raw.put_u8(BASE_PREFIX);
    raw.put_u8(key.kind);
    raw.put_u32(key.id);
    raw
}

fn diff_key(height: u64, key: RecordKey) -> Vec<u8> {
    let mut raw = Vec::with_capacity(DIFF_KEY_LEN);
    raw.put_u8(DIFF_PREFIX);
    raw.put_u64(height);
    raw.put_u8(key.kind);
    raw.put_u32(key.id);
    raw
}

fn parse_base_key(raw: &[u8]) -> Result<RecordKey, StoreError> {
    if raw.len() != BASE_KEY_LEN {
        return Err(Error::Invalid("RecordStore", "base key length").into());
    }
    let mut reader = &raw[1..];
    Ok(RecordKey::new(reader.get_u8(), reader.get_u32()))
}

fn parse_diff_key(raw: &[u8]) -> Result<(u64, RecordKey), StoreError> {
    if raw.len() != DIFF_KEY_LEN {
        return Err(Error::Invalid("RecordStore", "diff key length").into());
    }
    let mut reader = &raw[1..];
    let height = reader.get_u64();
    Ok((height, RecordKey::new(reader.get_u8(), reader.get_u32())))
}

/// Rebuilds the index as of `height` from the base table and the diffs at or below it.
fn reconstruct<S: State, R: Record>(
    state: &S,
    height: u64,
) -> Result<BTreeMap<RecordKey, Version<R>>, StoreError> {
    let mut index = BTreeMap::new();
    for (raw, value) in state.scan_prefix(&[BASE_PREFIX])? {
        let key = parse_base_key(&raw)?;
        index.insert(key, Version::<R>::decode(value.as_slice())?);
    }
    for (raw, value) in state.scan_prefix(&[DIFF_PREFIX])? {
        let (at, key) = parse_diff_key(&raw)?;
        if at > height {
            break;
        }
        let value = R::decode(value.as_slice())?;
        index.insert(key, Version { height: at, value });
    }
    Ok(index)
}

fn collect<R: Record>(index: &BTreeMap<RecordKey, Version<R>>, kind: Option<u8>) -> BTreeMap<u32, R> {
    index
        .iter()
        .filter(|(key, _)| kind.map_or(true, |kind| key.kind == kind))
        .map(|(key, version)| (key.id, version.value.clone()))
        .collect()
}

struct Inner<S, R> {
    state: S,
    meta: Option<Meta>,
    latest: BTreeMap<RecordKey, Version<R>>,
}

/// Keeps per-record history for the last `depth` heights below the tip.
///
/// Saves and rollbacks are serialized behind a write lock and land in storage as one batch,
/// so readers never observe a partially applied save.
pub struct VersionedRecordStore<S: State, R: Record> {
    depth: u64,
    inner: RwLock<Inner<S, R>>,
}

impl<S: State, R: Record> VersionedRecordStore<S, R> {
    /// Opens a store over `state`, rebuilding the tip index from whatever it already holds.
    pub fn open(state: S, depth: u64) -> Result<Self, StoreError> {
        let meta = match state.get(META_KEY)? {
            Some(raw) => Some(Meta::decode(raw.as_slice())?),
            None => None,
        };
        let latest = match meta {
            Some(meta) => reconstruct(&state, meta.tip)?,
            None => BTreeMap::new(),
        };
        Ok(Self {
            depth,
            inner: RwLock::new(Inner {
                state,
                meta,
                latest,
            }),
        })
    }

    pub fn depth(&self) -> u64 {
        self.depth
    }

    /// Highest height saved (after rollbacks), or `None` for a store that was never written.
    pub fn tip(&self) -> Result<Option<u64>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.meta.map(|meta| meta.tip))
    }

    /// Lowest height that can still be read or saved.
    pub fn window_start(&self) -> Result<Option<u64>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.meta.map(|meta| self.earliest(meta)))
    }

    fn earliest(&self, meta: Meta) -> u64 {
        meta.tip
            .saturating_sub(self.depth)
            .max(meta.floor.unwrap_or(0))
    }

    /// Queues the folding of diffs that fall out of the window once the tip is `tip`.
    /// Returns the floor that goes with that tip.
    fn fold(
        &self,
        state: &S,
        meta: Option<Meta>,
        tip: u64,
        batch: &mut Vec<(Vec<u8>, Status)>,
    ) -> Result<Option<u64>, StoreError> {
        let floor = meta.and_then(|meta| meta.floor);
        let Some(limit) = tip.checked_sub(self.depth) else {
            return Ok(floor);
        };
        for (raw, value) in state.scan_prefix(&[DIFF_PREFIX])? {
            let (at, folded) = parse_diff_key(&raw)?;
            if at > limit {
                break;
            }
            let version = Version {
                height: at,
                value: R::decode(value.as_slice())?,
            };
            batch.push((base_key(folded), Status::Update(version.encode().to_vec())));
            batch.push((raw, Status::Delete));
        }
        Ok(Some(floor.map_or(limit, |floor| floor.max(limit))))
    }

    /// Records a new version of `record` effective at `height`.
    ///
    /// Saving the same key twice at one height keeps the last write.
    pub fn save(&self, record: R, height: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if let Some(meta) = inner.meta {
            let earliest = self.earliest(meta);
            if height < earliest {
                return Err(StoreError::BelowWindow { height, earliest });
            }
        }
        let key = record.key();
        let tip = inner.meta.map_or(height, |meta| meta.tip.max(height));
        let mut batch = Vec::new();
        let floor = self.fold(&inner.state, inner.meta, tip, &mut batch)?;
        let limit = tip.checked_sub(self.depth);

        let version = Version {
            height,
            value: record,
        };
        if limit.is_some_and(|limit| height <= limit) {
            batch.push((base_key(key), Status::Update(version.encode().to_vec())));
        } else {
            batch.push((
                diff_key(height, key),
                Status::Update(version.value.encode().to_vec()),
            ));
        }
        let meta = Meta { tip, floor };
        batch.push((META_KEY.to_vec(), Status::Update(meta.encode().to_vec())));
        inner.state.apply(batch)?;

        inner.meta = Some(meta);
        let stale = inner
            .latest
            .get(&key)
            .is_some_and(|current| current.height > height);
        if !stale {
            inner.latest.insert(key, version);
        }
        debug!(height, kind = key.kind, id = key.id, tip, "saved record version");
        Ok(())
    }

    /// Moves the tip up to `height` without writing a record, so heights that changed
    /// nothing here still count toward the window. No-op at or below the tip.
    pub fn advance(&self, height: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if inner.meta.is_some_and(|meta| meta.tip >= height) {
            return Ok(());
        }
        let mut batch = Vec::new();
        let floor = self.fold(&inner.state, inner.meta, height, &mut batch)?;
        let meta = Meta { tip: height, floor };
        batch.push((META_KEY.to_vec(), Status::Update(meta.encode().to_vec())));
        inner.state.apply(batch)?;
        inner.meta = Some(meta);
        Ok(())
    }

    /// Deletes every version and the tip, leaving a store that was never written.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let mut batch = Vec::new();
        for prefix in [BASE_PREFIX, DIFF_PREFIX] {
            for (raw, _) in inner.state.scan_prefix(&[prefix])? {
                batch.push((raw, Status::Delete));
            }
        }
        let discarded = batch.len();
        batch.push((META_KEY.to_vec(), Status::Delete));
        inner.state.apply(batch)?;
        inner.meta = None;
        inner.latest.clear();
        warn!(discarded, "cleared record store");
        Ok(())
    }

    /// Index of `kind` (or every kind, for single-kind stores) as of `height`.
    ///
    /// Returns `None` when the store is empty or `height` lies below the retained window.
    /// Heights above the tip see the tip's index.
    pub fn read(
        &self,
        kind: Option<u8>,
        height: u64,
    ) -> Result<Option<BTreeMap<u32, R>>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let Some(meta) = inner.meta else {
            return Ok(None);
        };
        if height < self.earliest(meta) {
            return Ok(None);
        }
        if height >= meta.tip {
            return Ok(Some(collect(&inner.latest, kind)));
        }
        let index = reconstruct::<S, R>(&inner.state, height)?;
        Ok(Some(collect(&index, kind)))
    }

    /// Value of `key` at the tip.
    pub fn latest(&self, key: RecordKey) -> Result<Option<R>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.latest.get(&key).map(|version| version.value.clone()))
    }

    /// Fails with [`StoreError::BelowWindow`] if history at `height` was already folded away.
    pub fn ensure_rollback(&self, height: u64) -> Result<(), StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        match inner.meta {
            Some(Meta {
                tip,
                floor: Some(floor),
            }) if height < tip && height < floor => Err(StoreError::BelowWindow {
                height,
                earliest: floor,
            }),
            _ => Ok(()),
        }
    }

    /// Discards every version written above `height`.
    ///
    /// Fails with [`StoreError::BelowWindow`] if history at `height` was already folded away.
    pub fn rollback_to(&self, height: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let Some(meta) = inner.meta else {
            return Ok(());
        };
        if height >= meta.tip {
            return Ok(());
        }
        if let Some(floor) = meta.floor {
            if height < floor {
                return Err(StoreError::BelowWindow {
                    height,
                    earliest: floor,
                });
            }
        }

        let mut batch = Vec::new();
        for (raw, _) in inner.state.scan_prefix(&[DIFF_PREFIX])? {
            let (at, _) = parse_diff_key(&raw)?;
            if at > height {
                batch.push((raw, Status::Delete));
            }
        }
        let discarded = batch.len();
        let rolled = Meta {
            tip: height,
            floor: meta.floor,
        };
        batch.push((META_KEY.to_vec(), Status::Update(rolled.encode().to_vec())));
        inner.state.apply(batch)?;

        let latest = reconstruct(&inner.state, height)?;
        inner.meta = Some(rolled);
        inner.latest = latest;
        warn!(from = meta.tip, to = height, discarded, "rolled back record store");
        Ok(())
    }
}
