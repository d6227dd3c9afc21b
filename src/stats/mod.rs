pub mod key;
pub mod record;
pub mod serde;

use std::collections::HashMap;

use ::serde::{Deserialize, Serialize};
use ahash::RandomState;

use crate::error::StatsError;
use key::{Key, KeyPair, KeyTriple};
use record::{
    DocFrequency, Frequency, KeyPairStats, KeyStats, KeyTripleStats,
};

pub use record::Distance;

/// Configuration fixed for the whole lifetime of a [`CollectionStats`].
///
/// `restricted` and `disable_unwindowed` govern behavior everywhere a
/// collection is touched; they are also written into the serialized form and
/// validated on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Maximum span (inclusive of both endpoints, in words) for a pair
    /// co-occurrence to count as windowed.
    pub pair_window: Distance,
    /// Maximum span for a triple co-occurrence.
    pub triple_window: Distance,
    /// Track only pre-declared keys/pairs/triples; everything else is
    /// silently dropped on ingestion and queries as a zero record.
    pub restricted: bool,
    /// Skip unwindowed document-presence tracking for pairs/triples,
    /// avoiding its O(distinct²)/O(distinct³) per-document cost.
    pub disable_unwindowed: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            pair_window: 12,
            triple_window: 15,
            restricted: false,
            disable_unwindowed: false,
        }
    }
}

impl StatsConfig {
    pub fn max_window(&self) -> Distance {
        self.pair_window.max(self.triple_window)
    }
}

/// Aggregate corpus statistics: per-key frequencies plus windowed pair and
/// triple co-occurrence counts with minimum-gap distances.
///
/// A collection is created empty, mutated only through a
/// [`CollectionStatsFiller`](crate::CollectionStatsFiller) (which takes
/// ownership for its lifetime) or by [`merge`](Self::merge), and queried or
/// serialized afterwards. Merge is commutative and associative in every
/// category, so shards built in parallel combine to the same result in any
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionStats<K: Key> {
    config: StatsConfig,
    num_docs: DocFrequency,
    key_frequency_sum: Frequency,
    pair_window_co_occ_sum: Frequency,
    triple_window_co_occ_sum: Frequency,
    keys: HashMap<K, KeyStats, RandomState>,
    pairs: HashMap<KeyPair<K>, KeyPairStats, RandomState>,
    triples: HashMap<KeyTriple<K>, KeyTripleStats, RandomState>,
}

impl<K: Key> CollectionStats<K> {
    pub fn new(config: StatsConfig) -> Self {
        Self {
            config,
            num_docs: 0,
            key_frequency_sum: 0,
            pair_window_co_occ_sum: 0,
            triple_window_co_occ_sum: 0,
            keys: HashMap::with_hasher(RandomState::new()),
            pairs: HashMap::with_hasher(RandomState::new()),
            triples: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// Unrestricted, unwindowed-enabled collection with the given windows.
    pub fn with_windows(pair_window: Distance, triple_window: Distance) -> Self {
        Self::new(StatsConfig {
            pair_window,
            triple_window,
            ..StatsConfig::default()
        })
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn num_docs(&self) -> DocFrequency {
        self.num_docs
    }

    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    pub fn num_pairs(&self) -> usize {
        self.pairs.len()
    }

    pub fn num_triples(&self) -> usize {
        self.triples.len()
    }

    pub fn key_frequency_sum(&self) -> Frequency {
        self.key_frequency_sum
    }

    pub fn pair_window_co_occ_sum(&self) -> Frequency {
        self.pair_window_co_occ_sum
    }

    pub fn triple_window_co_occ_sum(&self) -> Frequency {
        self.triple_window_co_occ_sum
    }

    pub fn key_entries(&self) -> impl Iterator<Item = (&K, &KeyStats)> {
        self.keys.iter()
    }

    pub fn pair_entries(&self) -> impl Iterator<Item = (&KeyPair<K>, &KeyPairStats)> {
        self.pairs.iter()
    }

    pub fn triple_entries(&self) -> impl Iterator<Item = (&KeyTriple<K>, &KeyTripleStats)> {
        self.triples.iter()
    }

    /// Statistics for one key; the zero record when the key was never
    /// tracked. Never an error, even in restricted mode.
    pub fn key_stats(&self, key: K) -> KeyStats {
        self.keys.get(&key).copied().unwrap_or_default()
    }

    pub fn pair_stats(&self, first: K, second: K) -> KeyPairStats {
        self.pair_stats_of(KeyPair::new(first, second))
    }

    /// Statistics for a pair, zero record when absent.
    ///
    /// With unwindowed tracking enabled, the unwindowed presence of a
    /// self-pair (x, x) is by definition the presence of the singleton x, so
    /// its `document_frequency` is derived from the key record rather than
    /// taken from (or missing in) the pair map.
    pub fn pair_stats_of(&self, pair: KeyPair<K>) -> KeyPairStats {
        let found = self.pairs.get(&pair).copied();
        if self.config.disable_unwindowed {
            return found.unwrap_or_default();
        }
        let mut stats = found.unwrap_or_default();
        if pair.has_repeated_element() {
            stats.document_frequency = self.key_stats(pair.first()).document_frequency;
        }
        stats
    }

    pub fn triple_stats(&self, first: K, second: K, third: K) -> KeyTripleStats {
        self.triple_stats_of(KeyTriple::new(first, second, third))
    }

    /// Statistics for a triple, zero record when absent; degenerate triples
    /// derive their unwindowed presence the same way self-pairs do: all
    /// elements equal → singleton presence, exactly two equal → presence of
    /// the remaining distinct pair.
    pub fn triple_stats_of(&self, triple: KeyTriple<K>) -> KeyTripleStats {
        let found = self.triples.get(&triple).copied();
        if self.config.disable_unwindowed {
            return found.unwrap_or_default();
        }
        let mut stats = found.unwrap_or_default();
        // elements are sorted, so first == third means all three are equal
        if triple.first() == triple.third() {
            stats.document_frequency = self.key_stats(triple.first()).document_frequency;
        } else if triple.first() == triple.second() {
            stats.document_frequency = self
                .pair_stats(triple.first(), triple.third())
                .document_frequency;
        } else if triple.second() == triple.third() {
            stats.document_frequency = self
                .pair_stats(triple.second(), triple.first())
                .document_frequency;
        }
        stats
    }

    /// Merge another collection into this one.
    ///
    /// Both collections must share the same window sizes and flags. Counters
    /// and sums add; per category, entries already present merge and unseen
    /// entries are inserted only when this collection is not restricted
    /// (restricted mode silently discards unknown incoming entries).
    pub fn merge(&mut self, other: &CollectionStats<K>) -> Result<(), StatsError> {
        if self.config.pair_window != other.config.pair_window
            || self.config.triple_window != other.config.triple_window
        {
            return Err(StatsError::WindowMismatch {
                left_pair: self.config.pair_window,
                left_triple: self.config.triple_window,
                right_pair: other.config.pair_window,
                right_triple: other.config.triple_window,
            });
        }
        if self.config.restricted != other.config.restricted
            || self.config.disable_unwindowed != other.config.disable_unwindowed
        {
            return Err(StatsError::FlagMismatch {
                expected_restricted: self.config.restricted,
                found_restricted: other.config.restricted,
                expected_disable_unwindowed: self.config.disable_unwindowed,
                found_disable_unwindowed: other.config.disable_unwindowed,
            });
        }

        self.num_docs += other.num_docs;
        self.key_frequency_sum += other.key_frequency_sum;
        self.pair_window_co_occ_sum += other.pair_window_co_occ_sum;
        self.triple_window_co_occ_sum += other.triple_window_co_occ_sum;

        let restricted = self.config.restricted;
        for (k, v) in &other.keys {
            if let Some(existing) = self.keys.get_mut(k) {
                existing.merge(v);
            } else if !restricted {
                self.keys.insert(*k, *v);
            }
        }
        for (k, v) in &other.pairs {
            if let Some(existing) = self.pairs.get_mut(k) {
                existing.merge(v);
            } else if !restricted {
                self.pairs.insert(*k, *v);
            }
        }
        for (k, v) in &other.triples {
            if let Some(existing) = self.triples.get_mut(k) {
                existing.merge(v);
            } else if !restricted {
                self.triples.insert(*k, *v);
            }
        }
        Ok(())
    }

    /// Reset every counter and map, preserving the configuration.
    pub fn clear(&mut self) {
        self.num_docs = 0;
        self.key_frequency_sum = 0;
        self.pair_window_co_occ_sum = 0;
        self.triple_window_co_occ_sum = 0;
        self.keys.clear();
        self.pairs.clear();
        self.triples.clear();
    }
}

/// Crate-private mutators used by the filler while it owns the collection.
impl<K: Key> CollectionStats<K> {
    #[inline]
    pub(crate) fn bump_doc_count(&mut self) {
        self.num_docs += 1;
    }

    /// Merge one per-document key record in. Restricted mode only updates
    /// entries already present; returns whether the record was applied.
    #[inline]
    pub(crate) fn apply_key(&mut self, key: K, stats: KeyStats) -> bool {
        if let Some(existing) = self.keys.get_mut(&key) {
            existing.merge(&stats);
        } else if !self.config.restricted {
            self.keys.insert(key, stats);
        } else {
            return false;
        }
        self.key_frequency_sum += stats.frequency;
        true
    }

    #[inline]
    pub(crate) fn apply_pair(&mut self, pair: KeyPair<K>, stats: KeyPairStats) -> bool {
        if let Some(existing) = self.pairs.get_mut(&pair) {
            existing.merge(&stats);
        } else if !self.config.restricted {
            self.pairs.insert(pair, stats);
        } else {
            return false;
        }
        self.pair_window_co_occ_sum += stats.window_frequency;
        true
    }

    #[inline]
    pub(crate) fn apply_triple(&mut self, triple: KeyTriple<K>, stats: KeyTripleStats) -> bool {
        if let Some(existing) = self.triples.get_mut(&triple) {
            existing.merge(&stats);
        } else if !self.config.restricted {
            self.triples.insert(triple, stats);
        } else {
            return false;
        }
        self.triple_window_co_occ_sum += stats.window_frequency;
        true
    }

    /// Seed a zero-valued record so restricted ingestion has a slot to
    /// update. Leaves existing records untouched.
    pub(crate) fn insert_zero_key(&mut self, key: K) {
        self.keys.entry(key).or_default();
    }

    pub(crate) fn insert_zero_pair(&mut self, pair: KeyPair<K>) {
        self.pairs.entry(pair).or_default();
    }

    pub(crate) fn insert_zero_triple(&mut self, triple: KeyTriple<K>) {
        self.triples.entry(triple).or_default();
    }
}
