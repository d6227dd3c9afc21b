//! Shared collector buffer of the buffered merge strategy.
//!
//! Instead of merging per-document records into the hash maps one by one,
//! workers append them to typed arrays held under the same lock. When the
//! byte budget runs out the arena is flushed: each array is sorted by entry,
//! equal-entry runs are merged into a single record, and only those land in
//! the maps. Sorting batches is cheaper than per-record hashing when
//! documents are small and entries repeat across documents.

use std::mem::size_of;

use rayon::prelude::*;
use tracing::trace;

use crate::stats::key::{Key, KeyPair, KeyTriple};
use crate::stats::record::{KeyPairStats, KeyStats, KeyTripleStats};
use crate::stats::CollectionStats;

pub(crate) struct FlushArena<K: Key> {
    keys: Vec<(K, KeyStats)>,
    pairs: Vec<(KeyPair<K>, KeyPairStats)>,
    triples: Vec<(KeyTriple<K>, KeyTripleStats)>,
    remaining: usize,
    capacity: usize,
}

impl<K: Key> FlushArena<K> {
    pub(crate) fn with_capacity(bytes: usize) -> Self {
        Self {
            keys: Vec::new(),
            pairs: Vec::new(),
            triples: Vec::new(),
            remaining: bytes,
            capacity: bytes,
        }
    }

    /// In-memory size of the largest entry; the buffer must hold at least
    /// one of these.
    pub(crate) fn max_entry_size() -> usize {
        size_of::<(K, KeyStats)>()
            .max(size_of::<(KeyPair<K>, KeyPairStats)>())
            .max(size_of::<(KeyTriple<K>, KeyTripleStats)>())
    }

    pub(crate) fn push_key(
        &mut self,
        stats: &mut CollectionStats<K>,
        key: K,
        record: KeyStats,
    ) {
        let width = size_of::<(K, KeyStats)>();
        if self.remaining < width {
            self.flush(stats);
        }
        self.keys.push((key, record));
        self.remaining -= width;
    }

    pub(crate) fn push_pair(
        &mut self,
        stats: &mut CollectionStats<K>,
        pair: KeyPair<K>,
        record: KeyPairStats,
    ) {
        let width = size_of::<(KeyPair<K>, KeyPairStats)>();
        if self.remaining < width {
            self.flush(stats);
        }
        self.pairs.push((pair, record));
        self.remaining -= width;
    }

    pub(crate) fn push_triple(
        &mut self,
        stats: &mut CollectionStats<K>,
        triple: KeyTriple<K>,
        record: KeyTripleStats,
    ) {
        let width = size_of::<(KeyTriple<K>, KeyTripleStats)>();
        if self.remaining < width {
            self.flush(stats);
        }
        self.triples.push((triple, record));
        self.remaining -= width;
    }

    /// Sort, merge equal-entry runs and apply everything to the collection,
    /// leaving the arena empty with a full budget.
    pub(crate) fn flush(&mut self, stats: &mut CollectionStats<K>) {
        trace!(
            keys = self.keys.len(),
            pairs = self.pairs.len(),
            triples = self.triples.len(),
            "flushing collector buffer"
        );

        self.keys.par_sort_unstable_by(|a, b| a.0.cmp(&b.0));
        let mut run = self.keys.drain(..).peekable();
        while let Some((key, mut merged)) = run.next() {
            while let Some((_, record)) = run.next_if(|(next, _)| *next == key) {
                merged.merge(&record);
            }
            stats.apply_key(key, merged);
        }

        self.pairs.par_sort_unstable_by(|a, b| a.0.cmp(&b.0));
        let mut run = self.pairs.drain(..).peekable();
        while let Some((pair, mut merged)) = run.next() {
            while let Some((_, record)) = run.next_if(|(next, _)| *next == pair) {
                merged.merge(&record);
            }
            stats.apply_pair(pair, merged);
        }

        self.triples.par_sort_unstable_by(|a, b| a.0.cmp(&b.0));
        let mut run = self.triples.drain(..).peekable();
        while let Some((triple, mut merged)) = run.next() {
            while let Some((_, record)) = run.next_if(|(next, _)| *next == triple) {
                merged.merge(&record);
            }
            stats.apply_triple(triple, merged);
        }

        self.remaining = self.capacity;
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.pairs.is_empty() && self.triples.is_empty()
    }
}
