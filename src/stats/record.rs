use serde::{Deserialize, Serialize};

/// Total occurrence count across the whole collection.
pub type Frequency = u64;
/// Number of documents in which something occurs.
pub type DocFrequency = u32;
/// Inter-match gap, measured in words.
pub type Distance = u16;

/// Sentinel for "no gap observed yet". `window_min_dist` is seeded with this
/// value and only ever decreases.
pub const INFINITE_DIST: Distance = Distance::MAX;

/// Per-key accumulator.
///
/// `frequency_square` is the sum over documents of the squared per-document
/// occurrence count, which lets variance be derived from merged shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyStats {
    /// Number of documents containing the key at least once.
    pub document_frequency: DocFrequency,
    /// Total occurrence count across all documents.
    pub frequency: Frequency,
    /// Sum over documents of (per-document occurrence count)².
    pub frequency_square: Frequency,
}

impl KeyStats {
    pub fn new(
        document_frequency: DocFrequency,
        frequency: Frequency,
        frequency_square: Frequency,
    ) -> Self {
        Self {
            document_frequency,
            frequency,
            frequency_square,
        }
    }

    /// Element-wise addition. Commutative and associative; `Default` is the
    /// identity.
    #[inline]
    pub fn merge(&mut self, other: &KeyStats) {
        self.document_frequency += other.document_frequency;
        self.frequency += other.frequency;
        self.frequency_square += other.frequency_square;
    }
}

/// Per-pair accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPairStats {
    /// Documents where the pair co-occurs anywhere, regardless of distance.
    /// Always zero when unwindowed tracking is disabled.
    pub document_frequency: DocFrequency,
    /// Documents with at least one co-occurrence inside the pair window.
    pub window_document_frequency: DocFrequency,
    /// Total windowed co-occurrence count.
    pub window_frequency: Frequency,
    /// Sum over documents of (per-document windowed count)².
    pub window_frequency_square: Frequency,
    /// Minimum observed inter-match gap, in words.
    pub window_min_dist: Distance,
}

impl Default for KeyPairStats {
    fn default() -> Self {
        Self {
            document_frequency: 0,
            window_document_frequency: 0,
            window_frequency: 0,
            window_frequency_square: 0,
            window_min_dist: INFINITE_DIST,
        }
    }
}

impl KeyPairStats {
    pub fn new(
        document_frequency: DocFrequency,
        window_document_frequency: DocFrequency,
        window_frequency: Frequency,
        window_frequency_square: Frequency,
        window_min_dist: Distance,
    ) -> Self {
        Self {
            document_frequency,
            window_document_frequency,
            window_frequency,
            window_frequency_square,
            window_min_dist,
        }
    }

    /// Sums add, `window_min_dist` takes the minimum.
    #[inline]
    pub fn merge(&mut self, other: &KeyPairStats) {
        self.document_frequency += other.document_frequency;
        self.window_document_frequency += other.window_document_frequency;
        self.window_frequency += other.window_frequency;
        self.window_frequency_square += other.window_frequency_square;
        if self.window_min_dist > other.window_min_dist {
            self.window_min_dist = other.window_min_dist;
        }
    }
}

/// Per-triple accumulator. Same shape and merge rule as [`KeyPairStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyTripleStats {
    pub document_frequency: DocFrequency,
    pub window_document_frequency: DocFrequency,
    pub window_frequency: Frequency,
    pub window_frequency_square: Frequency,
    pub window_min_dist: Distance,
}

impl Default for KeyTripleStats {
    fn default() -> Self {
        Self {
            document_frequency: 0,
            window_document_frequency: 0,
            window_frequency: 0,
            window_frequency_square: 0,
            window_min_dist: INFINITE_DIST,
        }
    }
}

impl KeyTripleStats {
    pub fn new(
        document_frequency: DocFrequency,
        window_document_frequency: DocFrequency,
        window_frequency: Frequency,
        window_frequency_square: Frequency,
        window_min_dist: Distance,
    ) -> Self {
        Self {
            document_frequency,
            window_document_frequency,
            window_frequency,
            window_frequency_square,
            window_min_dist,
        }
    }

    #[inline]
    pub fn merge(&mut self, other: &KeyTripleStats) {
        self.document_frequency += other.document_frequency;
        self.window_document_frequency += other.window_document_frequency;
        self.window_frequency += other.window_frequency;
        self.window_frequency_square += other.window_frequency_square;
        if self.window_min_dist > other.window_min_dist {
            self.window_min_dist = other.window_min_dist;
        }
    }
}
