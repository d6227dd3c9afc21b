//! Per-document extraction: turns an ordered match stream into key
//! occurrences, windowed pair/triple co-occurrences and unwindowed presence
//! markers, feeding whichever per-document sink the merge strategy uses.

use std::collections::HashMap;

use ahash::RandomState;

use crate::matcher::PatternMatch;
use crate::stats::key::{Key, KeyPair, KeyTriple};
use crate::stats::record::{Distance, Frequency, INFINITE_DIST};

use super::restrict::{SuitabilityIndex, SUITABLE_FOR_PAIR, SUITABLE_FOR_TRIPLE};

/// Window sizes in `usize` for comparison against word spans.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WindowConfig {
    pub pair: usize,
    pub triple: usize,
    pub max: usize,
}

impl WindowConfig {
    pub(crate) fn new(pair: Distance, triple: Distance) -> Self {
        Self {
            pair: pair as usize,
            triple: triple as usize,
            max: pair.max(triple) as usize,
        }
    }
}

/// Receiver for the occurrences extracted from one document.
pub(crate) trait DocSink<K: Key> {
    fn push_key(&mut self, key: K);
    fn push_pair(&mut self, pair: KeyPair<K>, gap: Distance);
    fn push_triple(&mut self, triple: KeyTriple<K>, gap: Distance);
}

/// Walk the match stream and emit every windowed co-occurrence.
///
/// `matches` must be sorted by ascending `end_pos` (ties by decreasing
/// length) and `starts[i]` must hold the start offset of `matches[i]`. The
/// `min_m` cursor tracks the first match starting strictly after the current
/// left end; it only moves forward because both sequences are monotonic.
///
/// Gaps count the words strictly between the patterns: for a pair
/// `starts[r] - end(l) - 1`, for a triple the sum of its two inner gaps. A
/// window is the word span from the left start to the right end, inclusive.
pub(crate) fn extract_windows<K: Key, S: DocSink<K>>(
    matches: &[PatternMatch<K>],
    starts: &[usize],
    windows: &WindowConfig,
    suitable: Option<&SuitabilityIndex<K>>,
    sink: &mut S,
) {
    let n = matches.len();
    let mut min_m = 1usize;

    for l in 0..n {
        let l_match = matches[l];

        let l_mask = match suitable {
            Some(index) => index.key_mask(&l_match.pattern),
            None => u8::MAX,
        };

        // record the key whenever it can participate in any count; useless
        // entries are discarded later by the update-only restricted apply
        if l_mask != 0 {
            sink.push_key(l_match.pattern);
        }
        if l_mask & (SUITABLE_FOR_PAIR | SUITABLE_FOR_TRIPLE) == 0 {
            continue;
        }

        while min_m < n && l_match.end_pos >= starts[min_m] {
            min_m += 1;
        }

        for r in min_m..n {
            // starts are not monotonic under the tie-break order, so a later
            // match can still overlap the left one
            if l_match.end_pos >= starts[r] {
                continue;
            }
            let r_match = matches[r];

            let window = r_match.end_pos - starts[l] + 1;
            if window > windows.max {
                break;
            }

            let pair = KeyPair::new(l_match.pattern, r_match.pattern);
            let pair_mask = match suitable {
                Some(index) => index.pair_mask(&pair),
                None => u8::MAX,
            };

            if window <= windows.pair && pair_mask & SUITABLE_FOR_PAIR != 0 {
                let gap = (starts[r] - l_match.end_pos - 1) as Distance;
                sink.push_pair(pair, gap);
            }

            if window <= windows.triple && pair_mask & SUITABLE_FOR_TRIPLE != 0 {
                for m in min_m..r {
                    let m_match = matches[m];
                    if l_match.end_pos >= starts[m] {
                        continue;
                    }
                    if m_match.end_pos >= starts[r] {
                        break;
                    }
                    let gap = ((starts[r] - m_match.end_pos)
                        + (starts[m] - l_match.end_pos)
                        - 2) as Distance;
                    sink.push_triple(KeyTriple::with_pair(pair, m_match.pattern), gap);
                }
            }
        }
    }
}

/// Enumerate the distinct unordered pairs and triples present in a document,
/// given its sorted deduplicated keys. In restricted mode only combinations
/// the suitability index allows are visited.
pub(crate) fn enumerate_presence<K: Key>(
    distinct: &[K],
    suitable: Option<&SuitabilityIndex<K>>,
    mut on_pair: impl FnMut(KeyPair<K>),
    mut on_triple: impl FnMut(KeyTriple<K>),
) {
    for l in 0..distinct.len() {
        for r in (l + 1)..distinct.len() {
            let pair = KeyPair::new(distinct[l], distinct[r]);
            let mask = match suitable {
                Some(index) => {
                    let mask = index.pair_mask(&pair);
                    if mask == 0 {
                        continue;
                    }
                    mask
                }
                None => u8::MAX,
            };
            if mask & SUITABLE_FOR_PAIR != 0 {
                on_pair(pair);
            }
            if mask & SUITABLE_FOR_TRIPLE != 0 {
                for m in (l + 1)..r {
                    on_triple(KeyTriple::with_pair(pair, distinct[m]));
                }
            }
        }
    }
}

/// Per-document sink of the direct merge strategy: hash maps keyed by
/// entry, holding the windowed count and the minimum gap seen so far.
pub(crate) struct DocAccumulator<K: Key> {
    pub(crate) keys: HashMap<K, Frequency, RandomState>,
    pub(crate) pairs: HashMap<KeyPair<K>, (Frequency, Distance), RandomState>,
    pub(crate) triples: HashMap<KeyTriple<K>, (Frequency, Distance), RandomState>,
}

impl<K: Key> DocAccumulator<K> {
    pub(crate) fn new() -> Self {
        Self {
            keys: HashMap::with_hasher(RandomState::new()),
            pairs: HashMap::with_hasher(RandomState::new()),
            triples: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// Insert zero-count presence markers for every distinct pair/triple in
    /// the document that has no windowed entry yet.
    pub(crate) fn mark_presence(&mut self, suitable: Option<&SuitabilityIndex<K>>) {
        let mut distinct: Vec<K> = self.keys.keys().copied().collect();
        distinct.sort_unstable();

        let pairs = &mut self.pairs;
        let triples = &mut self.triples;
        enumerate_presence(
            &distinct,
            suitable,
            |pair| {
                pairs.entry(pair).or_insert((0, INFINITE_DIST));
            },
            |triple| {
                triples.entry(triple).or_insert((0, INFINITE_DIST));
            },
        );
    }

    pub(crate) fn clear(&mut self) {
        self.keys.clear();
        self.pairs.clear();
        self.triples.clear();
    }
}

impl<K: Key> DocSink<K> for DocAccumulator<K> {
    fn push_key(&mut self, key: K) {
        *self.keys.entry(key).or_insert(0) += 1;
    }

    fn push_pair(&mut self, pair: KeyPair<K>, gap: Distance) {
        let entry = self.pairs.entry(pair).or_insert((0, INFINITE_DIST));
        entry.0 += 1;
        if gap < entry.1 {
            entry.1 = gap;
        }
    }

    fn push_triple(&mut self, triple: KeyTriple<K>, gap: Distance) {
        let entry = self.triples.entry(triple).or_insert((0, INFINITE_DIST));
        entry.0 += 1;
        if gap < entry.1 {
            entry.1 = gap;
        }
    }
}

/// Per-document sink of the buffered merge strategy: flat append-only
/// vectors of raw occurrences, reduced by sort-and-scan afterwards.
/// Presence markers are appended with [`INFINITE_DIST`] so the reduction can
/// tell them apart from windowed records, whose gaps are always finite.
pub(crate) struct DocBuffer<K: Key> {
    pub(crate) keys: Vec<K>,
    pub(crate) pairs: Vec<(KeyPair<K>, Distance)>,
    pub(crate) triples: Vec<(KeyTriple<K>, Distance)>,
}

impl<K: Key> DocBuffer<K> {
    pub(crate) fn new() -> Self {
        Self {
            keys: Vec::new(),
            pairs: Vec::new(),
            triples: Vec::new(),
        }
    }

    /// Append presence markers for the given sorted deduplicated keys.
    pub(crate) fn mark_presence(
        &mut self,
        distinct: &[K],
        suitable: Option<&SuitabilityIndex<K>>,
    ) {
        let pairs = &mut self.pairs;
        let triples = &mut self.triples;
        enumerate_presence(
            distinct,
            suitable,
            |pair| pairs.push((pair, INFINITE_DIST)),
            |triple| triples.push((triple, INFINITE_DIST)),
        );
    }

    pub(crate) fn clear(&mut self) {
        self.keys.clear();
        self.pairs.clear();
        self.triples.clear();
    }
}

impl<K: Key> DocSink<K> for DocBuffer<K> {
    fn push_key(&mut self, key: K) {
        self.keys.push(key);
    }

    fn push_pair(&mut self, pair: KeyPair<K>, gap: Distance) {
        self.pairs.push((pair, gap));
    }

    fn push_triple(&mut self, triple: KeyTriple<K>, gap: Distance) {
        self.triples.push((triple, gap));
    }
}
