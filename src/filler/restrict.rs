//! Suitability masks for restricted collections.
//!
//! In restricted mode the extraction loops consult these masks to skip work
//! early: a key (or pair of keys) that cannot contribute to any declared
//! entry is pruned before pair/triple enumeration. The masks are an
//! over-approximation; exact filtering still happens when per-document
//! records are applied to the collection, which in restricted mode only
//! updates entries that already exist.

use std::collections::HashMap;

use ahash::RandomState;

use crate::stats::key::{Key, KeyPair, KeyTriple};
use crate::stats::CollectionStats;

pub(crate) const SUITABLE_FOR_KEY: u8 = 1 << 0;
pub(crate) const SUITABLE_FOR_PAIR: u8 = 1 << 1;
pub(crate) const SUITABLE_FOR_TRIPLE: u8 = 1 << 2;

/// Key- and pair-level bitmasks recording which declared entries each key
/// (or key pair) participates in.
#[derive(Debug, Default)]
pub(crate) struct SuitabilityIndex<K: Key> {
    keys: HashMap<K, u8, RandomState>,
    pairs: HashMap<KeyPair<K>, u8, RandomState>,
}

impl<K: Key> SuitabilityIndex<K> {
    pub(crate) fn new() -> Self {
        Self {
            keys: HashMap::with_hasher(RandomState::new()),
            pairs: HashMap::with_hasher(RandomState::new()),
        }
    }

    #[inline]
    pub(crate) fn key_mask(&self, key: &K) -> u8 {
        self.keys.get(key).copied().unwrap_or(0)
    }

    #[inline]
    pub(crate) fn pair_mask(&self, pair: &KeyPair<K>) -> u8 {
        self.pairs.get(pair).copied().unwrap_or(0)
    }

    /// Declare a key restriction, seeding its zero record so ingestion (which
    /// is update-only in restricted mode) has a slot to merge into.
    pub(crate) fn register_key(&mut self, stats: &mut CollectionStats<K>, key: K) {
        self.add_key(stats, key, true);
    }

    pub(crate) fn register_pair(&mut self, stats: &mut CollectionStats<K>, pair: KeyPair<K>) {
        self.add_pair(stats, pair, true);
    }

    pub(crate) fn register_triple(&mut self, stats: &mut CollectionStats<K>, triple: KeyTriple<K>) {
        self.add_triple(stats, triple, true);
    }

    /// Mark suitability for an entry already present in the collection
    /// (used when a filler attaches to a pre-populated restricted
    /// collection). No zero record is inserted for the entry itself, but
    /// degenerate promotions still seed the entries their query-time
    /// derivation depends on.
    pub(crate) fn seed_key(&mut self, stats: &mut CollectionStats<K>, key: K) {
        self.add_key(stats, key, false);
    }

    pub(crate) fn seed_pair(&mut self, stats: &mut CollectionStats<K>, pair: KeyPair<K>) {
        self.add_pair(stats, pair, false);
    }

    pub(crate) fn seed_triple(&mut self, stats: &mut CollectionStats<K>, triple: KeyTriple<K>) {
        self.add_triple(stats, triple, false);
    }

    fn add_key(&mut self, stats: &mut CollectionStats<K>, key: K, insert: bool) {
        if insert {
            stats.insert_zero_key(key);
        }
        *self.keys.entry(key).or_insert(0) |= SUITABLE_FOR_KEY;
    }

    fn add_pair(&mut self, stats: &mut CollectionStats<K>, pair: KeyPair<K>, insert: bool) {
        if insert {
            stats.insert_zero_pair(pair);
        }
        *self.keys.entry(pair.first()).or_insert(0) |= SUITABLE_FOR_PAIR;
        *self.keys.entry(pair.second()).or_insert(0) |= SUITABLE_FOR_PAIR;
        *self.pairs.entry(pair).or_insert(0) |= SUITABLE_FOR_PAIR;

        // a self-pair derives its unwindowed presence from the singleton, so
        // the singleton must be tracked too
        if pair.has_repeated_element() {
            self.add_key(stats, pair.first(), true);
        }
    }

    fn add_triple(&mut self, stats: &mut CollectionStats<K>, triple: KeyTriple<K>, insert: bool) {
        if insert {
            stats.insert_zero_triple(triple);
        }
        for key in [triple.first(), triple.second(), triple.third()] {
            *self.keys.entry(key).or_insert(0) |= SUITABLE_FOR_TRIPLE;
        }
        for pair in [
            KeyPair::new(triple.first(), triple.second()),
            KeyPair::new(triple.first(), triple.third()),
            KeyPair::new(triple.second(), triple.third()),
        ] {
            *self.pairs.entry(pair).or_insert(0) |= SUITABLE_FOR_TRIPLE;
        }

        // degenerate triples derive their unwindowed presence from smaller
        // entries; elements are sorted, so first == third means all equal
        if triple.first() == triple.third() {
            self.add_key(stats, triple.first(), true);
        } else if triple.first() == triple.second() {
            self.add_pair(stats, KeyPair::new(triple.first(), triple.third()), true);
        } else if triple.second() == triple.third() {
            self.add_pair(stats, KeyPair::new(triple.second(), triple.first()), true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatsConfig;

    fn restricted_stats() -> CollectionStats<u32> {
        CollectionStats::new(StatsConfig {
            restricted: true,
            ..StatsConfig::default()
        })
    }

    #[test]
    fn key_registration_seeds_zero_record() {
        let mut stats = restricted_stats();
        let mut index = SuitabilityIndex::new();
        index.register_key(&mut stats, 7);
        assert_eq!(index.key_mask(&7), SUITABLE_FOR_KEY);
        assert_eq!(index.key_mask(&8), 0);
        assert_eq!(stats.num_keys(), 1);
    }

    #[test]
    fn pair_registration_marks_both_keys_and_the_pair() {
        let mut stats = restricted_stats();
        let mut index = SuitabilityIndex::new();
        index.register_pair(&mut stats, KeyPair::new(1, 2));
        assert_eq!(index.key_mask(&1), SUITABLE_FOR_PAIR);
        assert_eq!(index.key_mask(&2), SUITABLE_FOR_PAIR);
        assert_eq!(index.pair_mask(&KeyPair::new(2, 1)), SUITABLE_FOR_PAIR);
        assert_eq!(stats.num_pairs(), 1);
        assert_eq!(stats.num_keys(), 0);
    }

    #[test]
    fn self_pair_promotes_to_singleton() {
        let mut stats = restricted_stats();
        let mut index = SuitabilityIndex::new();
        index.register_pair(&mut stats, KeyPair::new(3, 3));
        assert_eq!(index.key_mask(&3), SUITABLE_FOR_KEY | SUITABLE_FOR_PAIR);
        assert_eq!(stats.num_keys(), 1);
        assert_eq!(stats.num_pairs(), 1);
    }

    #[test]
    fn triple_registration_marks_keys_and_component_pairs() {
        let mut stats = restricted_stats();
        let mut index = SuitabilityIndex::new();
        index.register_triple(&mut stats, KeyTriple::new(1, 2, 3));
        for key in [1, 2, 3] {
            assert_eq!(index.key_mask(&key), SUITABLE_FOR_TRIPLE);
        }
        for pair in [KeyPair::new(1, 2), KeyPair::new(1, 3), KeyPair::new(2, 3)] {
            assert_eq!(index.pair_mask(&pair), SUITABLE_FOR_TRIPLE);
        }
        assert_eq!(stats.num_triples(), 1);
        assert_eq!(stats.num_pairs(), 0);
        assert_eq!(stats.num_keys(), 0);
    }

    #[test]
    fn all_equal_triple_promotes_to_singleton() {
        let mut stats = restricted_stats();
        let mut index = SuitabilityIndex::new();
        index.register_triple(&mut stats, KeyTriple::new(5, 5, 5));
        assert_eq!(index.key_mask(&5), SUITABLE_FOR_KEY | SUITABLE_FOR_TRIPLE);
        assert_eq!(stats.num_keys(), 1);
        assert_eq!(stats.num_triples(), 1);
    }

    #[test]
    fn two_equal_triple_promotes_to_distinct_pair() {
        let mut stats = restricted_stats();
        let mut index = SuitabilityIndex::new();
        index.register_triple(&mut stats, KeyTriple::new(2, 2, 9));
        // promoted pair (2, 9) tracked for pair stats too
        assert_ne!(index.pair_mask(&KeyPair::new(2, 9)) & SUITABLE_FOR_PAIR, 0);
        assert_eq!(stats.num_pairs(), 1);
        assert_eq!(stats.num_triples(), 1);
        // and a promoted self-pair inside it does not appear
        assert_eq!(index.pair_mask(&KeyPair::new(2, 2)) & SUITABLE_FOR_PAIR, 0);
    }

    #[test]
    fn seeding_does_not_insert_top_level_records() {
        let mut stats = restricted_stats();
        let mut index = SuitabilityIndex::new();
        index.seed_pair(&mut stats, KeyPair::new(1, 2));
        index.seed_key(&mut stats, 4);
        assert_eq!(stats.num_pairs(), 0);
        assert_eq!(stats.num_keys(), 0);
        assert_eq!(index.key_mask(&4), SUITABLE_FOR_KEY);
        assert_eq!(index.pair_mask(&KeyPair::new(1, 2)), SUITABLE_FOR_PAIR);
    }

    #[test]
    fn masks_accumulate_across_registrations() {
        let mut stats = restricted_stats();
        let mut index = SuitabilityIndex::new();
        index.register_key(&mut stats, 1);
        index.register_pair(&mut stats, KeyPair::new(1, 2));
        index.register_triple(&mut stats, KeyTriple::new(1, 2, 3));
        assert_eq!(
            index.key_mask(&1),
            SUITABLE_FOR_KEY | SUITABLE_FOR_PAIR | SUITABLE_FOR_TRIPLE
        );
        assert_eq!(
            index.pair_mask(&KeyPair::new(1, 2)),
            SUITABLE_FOR_PAIR | SUITABLE_FOR_TRIPLE
        );
    }
}
