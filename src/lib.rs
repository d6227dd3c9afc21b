/// This crate computes streaming co-occurrence statistics over a document
/// collection: per-key frequencies plus windowed pair and triple
/// co-occurrence counts, for collocation and term-dependency models.
pub mod error;
pub mod filler;
pub mod matcher;
pub mod stats;
pub mod utils;

/// Collection Statistics
/// The central data structure of this crate. It aggregates, per corpus:
/// - Per-key document frequency, total frequency and squared frequency
/// - Windowed co-occurrence counts and minimum gaps for unordered key pairs
///   and triples
/// - Unwindowed document-presence counts for pairs and triples (optional)
///
/// A collection is filled through a `CollectionStatsFiller`, merged with
/// other shards via `merge`, queried by key/pair/triple, and persisted with
/// `dump`/`load` in a fixed-width binary format.
///
/// Queries never fail: unknown entries yield zero-valued records, and
/// degenerate pairs/triples (repeated keys) derive their document frequency
/// from the smaller entry they collapse to.
pub use stats::CollectionStats;

/// Collection configuration: window sizes plus the `restricted` and
/// `disable_unwindowed` flags. Fixed at construction, enforced on merge and
/// load.
pub use stats::StatsConfig;

/// Collection Statistics Filler
/// Multi-threaded ingestion front end. It owns a `CollectionStats` for its
/// lifetime, pulls documents from a bounded queue, extracts windowed
/// co-occurrences with a pluggable `PatternMatcher`, and merges per-document
/// records under a single lock using either the direct or the buffered
/// strategy.
///
/// For restricted collections, the tracked entries are declared through
/// `add_restriction_*` before the first document is submitted.
pub use filler::CollectionStatsFiller;

/// Worker pool configuration for the filler: thread count, queue bound and
/// merge strategy.
pub use filler::{FillerConfig, MergeStrategy};

/// Canonical unordered composite keys. Elements are sorted at construction,
/// so pairs and triples compare, hash and serialize independently of the
/// order their keys were supplied in.
pub use stats::key::{Key, KeyPair, KeyTriple};

/// Per-entry accumulators and their scalar types. All of them merge like
/// monoids: sums add, minimum distances take the minimum, and the zero
/// record is the identity.
pub use stats::record::{
    Distance, DocFrequency, Frequency, KeyPairStats, KeyStats, KeyTripleStats, INFINITE_DIST,
};

/// Pattern matching engine interface
/// `PatternMatcher` produces the ordered match stream the filler consumes;
/// `TokenMatcher` is a minimal single-token implementation over a fixed
/// vocabulary.
pub use matcher::{PatternMatch, PatternMatcher, TokenMatcher};

/// Error type covering configuration, merge-compatibility and
/// serialization failures.
pub use error::StatsError;
