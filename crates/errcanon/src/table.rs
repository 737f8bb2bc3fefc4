//! Weak, sharded table of canonical records.
//!
//! # Sharding Strategy
//!
//! The table is split into `NUM_SHARDS` (16) shards, each with its own
//! `RwLock` over `BUCKETS_PER_SHARD` (64) buckets:
//!
//! - shard: `hash & SHARD_MASK`
//! - bucket: `(hash >> SHARD_BITS) & BUCKET_MASK`
//!
//! A hit takes the read lock of one shard and allocates nothing. A miss
//! takes that shard's write lock and scans the bucket again before
//! inserting, so two equivalent records submitted concurrently can never
//! both become canonical.
//!
//! # Retention
//!
//! Entries hold `Weak` references. A canonical record lives exactly as long
//! as somebody outside the table holds it. Dead entries are dropped from a
//! bucket whenever that bucket is written, or all at once by `purge`.

// Allow cast truncation - masks are below 64
#![allow(clippy::cast_possible_truncation)]

use crate::record::ErrorRecord;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

const SHARD_BITS: u32 = 4;

/// Number of shards (power of 2 for masking).
const NUM_SHARDS: usize = 1 << SHARD_BITS;

/// Buckets per shard (power of 2 for masking).
const BUCKETS_PER_SHARD: usize = 64;

const SHARD_MASK: usize = NUM_SHARDS - 1;

const BUCKET_MASK: usize = BUCKETS_PER_SHARD - 1;

struct Entry {
    hash: u64,
    record: Weak<ErrorRecord>,
}

type Bucket = Vec<Entry>;

struct Shard {
    buckets: RwLock<Vec<Bucket>>,
}

impl Shard {
    fn new() -> Self {
        Shard {
            buckets: RwLock::new((0..BUCKETS_PER_SHARD).map(|_| Vec::new()).collect()),
        }
    }

    // Entries are only ever pushed or dropped whole, so a panic in another
    // holder cannot leave a bucket half-written.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Bucket>> {
        self.buckets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Bucket>> {
        self.buckets.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of `InternTable::find_or_insert`.
#[derive(Debug)]
pub enum Slot {
    /// An equivalent record was already canonical.
    Existing(Arc<ErrorRecord>),
    /// The submitted record became canonical.
    Inserted(Arc<ErrorRecord>),
}

impl Slot {
    /// The canonical record.
    #[must_use]
    pub fn into_record(self) -> Arc<ErrorRecord> {
        match self {
            Slot::Existing(record) | Slot::Inserted(record) => record,
        }
    }
}

/// Concurrent table mapping structural hashes to canonical records.
pub struct InternTable {
    shards: [Shard; NUM_SHARDS],
}

impl Default for InternTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InternTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        InternTable {
            shards: std::array::from_fn(|_| Shard::new()),
        }
    }

    fn locate(&self, hash: u64) -> (&Shard, usize) {
        let shard = &self.shards[hash as usize & SHARD_MASK];
        let bucket = (hash >> SHARD_BITS) as usize & BUCKET_MASK;
        (shard, bucket)
    }

    fn scan(
        bucket: &[Entry],
        hash: u64,
        eq: &mut impl FnMut(&ErrorRecord) -> bool,
    ) -> Option<Arc<ErrorRecord>> {
        bucket
            .iter()
            .filter(|entry| entry.hash == hash)
            .filter_map(|entry| entry.record.upgrade())
            .find(|candidate| eq(&**candidate))
    }

    /// Looks up a live record with `hash` accepted by `eq`.
    pub fn find(
        &self,
        hash: u64,
        mut eq: impl FnMut(&ErrorRecord) -> bool,
    ) -> Option<Arc<ErrorRecord>> {
        let (shard, bucket) = self.locate(hash);
        let buckets = shard.read();
        Self::scan(&buckets[bucket], hash, &mut eq)
    }

    /// Returns the live record with `hash` accepted by `eq`, or makes
    /// `record` canonical if there is none.
    ///
    /// The lookup and the insertion happen under one write lock.
    pub fn find_or_insert(
        &self,
        hash: u64,
        record: &Arc<ErrorRecord>,
        mut eq: impl FnMut(&ErrorRecord) -> bool,
    ) -> Slot {
        let (shard, bucket) = self.locate(hash);
        let mut buckets = shard.write();
        let entries = &mut buckets[bucket];

        // Double-check: another thread may have inserted while we waited
        if let Some(existing) = Self::scan(entries, hash, &mut eq) {
            return Slot::Existing(existing);
        }

        entries.retain(|entry| entry.record.strong_count() > 0);
        entries.push(Entry {
            hash,
            record: Arc::downgrade(record),
        });
        Slot::Inserted(Arc::clone(record))
    }

    /// Number of live canonical records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count(|entry| entry.record.strong_count() > 0)
    }

    /// Returns `true` if no live canonical record remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries held, live or dead.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.count(|_| true)
    }

    /// Number of live records with `hash` accepted by `eq`.
    ///
    /// Outside of a race with `find_or_insert` this is 0 or 1.
    pub fn count_matching(&self, hash: u64, mut eq: impl FnMut(&ErrorRecord) -> bool) -> usize {
        let (shard, bucket) = self.locate(hash);
        let buckets = shard.read();
        buckets[bucket]
            .iter()
            .filter(|entry| entry.hash == hash)
            .filter_map(|entry| entry.record.upgrade())
            .filter(|candidate| eq(&**candidate))
            .count()
    }

    /// Drops every dead entry and returns how many were dropped.
    pub fn purge(&self) -> usize {
        let mut dropped = 0;
        for shard in &self.shards {
            let mut buckets = shard.write();
            for bucket in buckets.iter_mut() {
                let before = bucket.len();
                bucket.retain(|entry| entry.record.strong_count() > 0);
                dropped += before - bucket.len();
            }
        }
        dropped
    }

    fn count(&self, mut keep: impl FnMut(&Entry) -> bool) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .read()
                    .iter()
                    .flat_map(|bucket| bucket.iter())
                    .filter(|&entry| keep(entry))
                    .count()
            })
            .sum()
    }
}
