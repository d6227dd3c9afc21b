//! Multi-threaded ingestion of documents into a [`CollectionStats`].
//!
//! A [`CollectionStatsFiller`] owns the collection for its lifetime: workers
//! pull documents from a bounded queue, extract occurrences into per-thread
//! structures and merge them into the shared collection under a single lock.
//! [`finish`](CollectionStatsFiller::finish) drains the queue, stops the
//! workers and hands the collection back.

mod buffered;
mod extract;
mod restrict;

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::debug;

use crate::error::StatsError;
use crate::matcher::{PatternMatch, PatternMatcher};
use crate::stats::key::{Key, KeyPair, KeyTriple};
use crate::stats::record::{
    DocFrequency, Frequency, KeyPairStats, KeyStats, KeyTripleStats, INFINITE_DIST,
};
use crate::stats::CollectionStats;

use buffered::FlushArena;
use extract::{extract_windows, DocAccumulator, DocBuffer, DocSink, WindowConfig};
use restrict::SuitabilityIndex;

/// How per-document records reach the shared collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Merge each document's records straight into the hash maps.
    Direct,
    /// Append records to a shared typed buffer and merge them in sorted
    /// batches once `buffer_bytes` of entries have accumulated. Pays off
    /// when entries repeat heavily across documents.
    Buffered { buffer_bytes: usize },
}

/// Worker pool configuration.
#[derive(Debug, Clone, Copy)]
pub struct FillerConfig {
    pub num_threads: usize,
    /// Bound honored by [`CollectionStatsFiller::update_blocking`].
    pub queue_capacity: usize,
    pub strategy: MergeStrategy,
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            num_threads: 1,
            queue_capacity: 1,
            strategy: MergeStrategy::Direct,
        }
    }
}

struct JobQueue {
    jobs: VecDeque<Vec<String>>,
    /// Threads currently processing a document (not parked on the queue).
    working: usize,
    restrictions_open: bool,
}

struct MergeTarget<K: Key> {
    stats: CollectionStats<K>,
    /// Present only under the buffered strategy.
    arena: Option<FlushArena<K>>,
}

struct Shared<K: Key> {
    queue: Mutex<JobQueue>,
    job_ready: Condvar,
    queue_space: Condvar,
    all_idle: Condvar,
    target: Mutex<MergeTarget<K>>,
    suitable: RwLock<SuitabilityIndex<K>>,
    restricted: bool,
    disable_unwindowed: bool,
    windows: WindowConfig,
    queue_capacity: usize,
    strategy: MergeStrategy,
}

/// Worker pool that fills a [`CollectionStats`] from documents.
///
/// The filler takes the collection by value and gives it back from
/// [`finish`](Self::finish); while it is alive, the collection is only
/// reachable through the filler, so no reader can observe a half-merged
/// document. Documents are slices of text fields: windows never span two
/// fields, presence is per document.
pub struct CollectionStatsFiller<K: Key> {
    shared: Arc<Shared<K>>,
    threads: Vec<JoinHandle<()>>,
}

impl<K: Key> CollectionStatsFiller<K> {
    /// Take ownership of `stats` and spawn the worker pool.
    ///
    /// If `stats` is restricted and already contains entries (for example
    /// after [`CollectionStats::load`]), those entries are adopted as the
    /// restriction set.
    pub fn new<M>(
        mut stats: CollectionStats<K>,
        matcher: Arc<M>,
        config: FillerConfig,
    ) -> Result<Self, StatsError>
    where
        M: PatternMatcher<K> + ?Sized + 'static,
    {
        if config.num_threads == 0 {
            return Err(StatsError::NoWorkerThreads);
        }
        if config.queue_capacity == 0 {
            return Err(StatsError::ZeroQueueCapacity);
        }
        let arena = match config.strategy {
            MergeStrategy::Direct => None,
            MergeStrategy::Buffered { buffer_bytes } => {
                let needed = FlushArena::<K>::max_entry_size();
                if buffer_bytes < needed {
                    return Err(StatsError::BufferTooSmall {
                        got: buffer_bytes,
                        needed,
                    });
                }
                Some(FlushArena::with_capacity(buffer_bytes))
            }
        };

        let stats_config = *stats.config();
        let mut suitable = SuitabilityIndex::new();
        if stats_config.restricted {
            let keys: Vec<K> = stats.key_entries().map(|(k, _)| *k).collect();
            let pairs: Vec<KeyPair<K>> = stats.pair_entries().map(|(p, _)| *p).collect();
            let triples: Vec<KeyTriple<K>> = stats.triple_entries().map(|(t, _)| *t).collect();
            for key in keys {
                suitable.seed_key(&mut stats, key);
            }
            for pair in pairs {
                suitable.seed_pair(&mut stats, pair);
            }
            for triple in triples {
                suitable.seed_triple(&mut stats, triple);
            }
        }

        let shared = Arc::new(Shared {
            queue: Mutex::new(JobQueue {
                jobs: VecDeque::new(),
                working: config.num_threads,
                restrictions_open: true,
            }),
            job_ready: Condvar::new(),
            queue_space: Condvar::new(),
            all_idle: Condvar::new(),
            target: Mutex::new(MergeTarget { stats, arena }),
            suitable: RwLock::new(suitable),
            restricted: stats_config.restricted,
            disable_unwindowed: stats_config.disable_unwindowed,
            windows: WindowConfig::new(stats_config.pair_window, stats_config.triple_window),
            queue_capacity: config.queue_capacity,
            strategy: config.strategy,
        });

        let mut threads = Vec::with_capacity(config.num_threads);
        for i in 0..config.num_threads {
            let shared = Arc::clone(&shared);
            let matcher = Arc::clone(&matcher);
            let handle = thread::Builder::new()
                .name(format!("stats-worker-{i}"))
                .spawn(move || worker_loop(shared, matcher))?;
            threads.push(handle);
        }
        debug!(
            num_threads = config.num_threads,
            strategy = ?config.strategy,
            restricted = stats_config.restricted,
            "collection stats filler started"
        );

        Ok(Self { shared, threads })
    }

    /// Restrict tracking to the given key. Only valid on a restricted
    /// collection, before the first document is submitted.
    pub fn add_restriction_key(&self, key: K) -> Result<(), StatsError> {
        self.check_restrictions_open()?;
        let mut suitable = self.shared.suitable.write();
        let mut target = self.shared.target.lock();
        suitable.register_key(&mut target.stats, key);
        Ok(())
    }

    pub fn add_restriction_pair(&self, first: K, second: K) -> Result<(), StatsError> {
        self.check_restrictions_open()?;
        let mut suitable = self.shared.suitable.write();
        let mut target = self.shared.target.lock();
        suitable.register_pair(&mut target.stats, KeyPair::new(first, second));
        Ok(())
    }

    pub fn add_restriction_triple(
        &self,
        first: K,
        second: K,
        third: K,
    ) -> Result<(), StatsError> {
        self.check_restrictions_open()?;
        let mut suitable = self.shared.suitable.write();
        let mut target = self.shared.target.lock();
        suitable.register_triple(&mut target.stats, KeyTriple::new(first, second, third));
        Ok(())
    }

    fn check_restrictions_open(&self) -> Result<(), StatsError> {
        if !self.shared.restricted {
            return Err(StatsError::NotRestricted);
        }
        let queue = self.shared.queue.lock();
        if !queue.restrictions_open {
            return Err(StatsError::RestrictionsClosed);
        }
        drop(queue);
        if self.shared.target.lock().stats.num_docs() > 0 {
            return Err(StatsError::RestrictionsClosed);
        }
        Ok(())
    }

    /// Queue a document for processing. Empty documents are discarded.
    /// Closes the restriction phase either way.
    pub fn update(&self, doc_fields: Vec<String>) {
        let mut queue = self.shared.queue.lock();
        queue.restrictions_open = false;
        if doc_fields.is_empty() {
            return;
        }
        queue.jobs.push_back(doc_fields);
        self.shared.job_ready.notify_one();
    }

    /// Like [`update`](Self::update), but waits for queue space instead of
    /// letting the queue grow without bound.
    pub fn update_blocking(&self, doc_fields: Vec<String>) {
        let mut queue = self.shared.queue.lock();
        queue.restrictions_open = false;
        if doc_fields.is_empty() {
            return;
        }
        while queue.jobs.len() > self.shared.queue_capacity {
            self.shared.queue_space.wait(&mut queue);
        }
        queue.jobs.push_back(doc_fields);
        self.shared.job_ready.notify_one();
    }

    /// Wait until every queued document has been merged, then drain the
    /// collector buffer. On return the collection reflects all documents
    /// submitted before the call.
    pub fn flush(&self) {
        {
            let mut queue = self.shared.queue.lock();
            while !queue.jobs.is_empty() || queue.working > 0 {
                self.shared.all_idle.wait(&mut queue);
            }
        }
        let mut target = self.shared.target.lock();
        let MergeTarget { stats, arena } = &mut *target;
        if let Some(arena) = arena.as_mut() {
            arena.flush(stats);
        }
    }

    /// Stop the workers and return the filled collection.
    pub fn finish(mut self) -> CollectionStats<K> {
        self.shutdown();
        let mut target = self.shared.target.lock();
        let config = *target.stats.config();
        mem::replace(&mut target.stats, CollectionStats::new(config))
    }

    fn shutdown(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        {
            let mut queue = self.shared.queue.lock();
            for _ in 0..self.threads.len() {
                // an empty document is the exit signal
                queue.jobs.push_back(Vec::new());
            }
            self.shared.job_ready.notify_all();
        }
        self.flush();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        debug!("collection stats filler stopped");
    }
}

impl<K: Key> Drop for CollectionStatsFiller<K> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<K, M>(shared: Arc<Shared<K>>, matcher: Arc<M>)
where
    K: Key,
    M: PatternMatcher<K> + ?Sized,
{
    let mut matches: Vec<PatternMatch<K>> = Vec::new();
    let mut starts: Vec<usize> = Vec::new();
    let mut accumulator = DocAccumulator::new();
    let mut buffer = DocBuffer::new();

    loop {
        let doc_fields = {
            let mut queue = shared.queue.lock();
            while queue.jobs.is_empty() {
                queue.working -= 1;
                if queue.working == 0 {
                    shared.all_idle.notify_all();
                }
                shared.job_ready.wait(&mut queue);
                queue.working += 1;
            }
            let fields = match queue.jobs.pop_front() {
                Some(fields) => fields,
                None => continue,
            };
            if fields.is_empty() {
                queue.working -= 1;
                if queue.working == 0 {
                    shared.all_idle.notify_all();
                }
                return;
            }
            shared.queue_space.notify_one();
            fields
        };

        let suitable_guard = shared.restricted.then(|| shared.suitable.read());
        let suitable = suitable_guard.as_deref();

        match shared.strategy {
            MergeStrategy::Direct => {
                extract_document(
                    &*matcher,
                    &doc_fields,
                    &shared.windows,
                    suitable,
                    &mut matches,
                    &mut starts,
                    &mut accumulator,
                );
                apply_direct(&shared, &mut accumulator, suitable);
            }
            MergeStrategy::Buffered { .. } => {
                extract_document(
                    &*matcher,
                    &doc_fields,
                    &shared.windows,
                    suitable,
                    &mut matches,
                    &mut starts,
                    &mut buffer,
                );
                apply_buffered(&shared, &mut buffer, suitable);
            }
        }
    }
}

/// Run extraction over every field of a document, feeding one sink. Windows
/// never span fields; the sink aggregates across them.
fn extract_document<K, M, S>(
    matcher: &M,
    doc_fields: &[String],
    windows: &WindowConfig,
    suitable: Option<&SuitabilityIndex<K>>,
    matches: &mut Vec<PatternMatch<K>>,
    starts: &mut Vec<usize>,
    sink: &mut S,
) where
    K: Key,
    M: PatternMatcher<K> + ?Sized,
    S: DocSink<K>,
{
    for field in doc_fields {
        matches.clear();
        matcher.find_patterns(field, matches);

        starts.clear();
        starts.extend(
            matches
                .iter()
                .map(|m| m.end_pos + 1 - matcher.pattern_length(m.pattern)),
        );

        extract_windows(matches, starts, windows, suitable, sink);
    }
}

fn apply_direct<K: Key>(
    shared: &Shared<K>,
    accumulator: &mut DocAccumulator<K>,
    suitable: Option<&SuitabilityIndex<K>>,
) {
    if !shared.disable_unwindowed {
        accumulator.mark_presence(suitable);
    }
    let presence_df: DocFrequency = if shared.disable_unwindowed { 0 } else { 1 };

    let mut target = shared.target.lock();
    let stats = &mut target.stats;
    stats.bump_doc_count();
    for (&key, &count) in &accumulator.keys {
        stats.apply_key(key, KeyStats::new(1, count, count * count));
    }
    for (&pair, &(count, min_gap)) in &accumulator.pairs {
        stats.apply_pair(
            pair,
            KeyPairStats::new(
                presence_df,
                (count > 0) as DocFrequency,
                count,
                count * count,
                min_gap,
            ),
        );
    }
    for (&triple, &(count, min_gap)) in &accumulator.triples {
        stats.apply_triple(
            triple,
            KeyTripleStats::new(
                presence_df,
                (count > 0) as DocFrequency,
                count,
                count * count,
                min_gap,
            ),
        );
    }
    drop(target);

    accumulator.clear();
}

fn apply_buffered<K: Key>(
    shared: &Shared<K>,
    buffer: &mut DocBuffer<K>,
    suitable: Option<&SuitabilityIndex<K>>,
) {
    buffer.keys.sort_unstable();
    {
        let mut target = shared.target.lock();
        let MergeTarget { stats, arena } = &mut *target;
        stats.bump_doc_count();
        if let Some(arena) = arena.as_mut() {
            let keys = &buffer.keys;
            let mut l = 0;
            while l < keys.len() {
                let key = keys[l];
                let mut r = l + 1;
                while r < keys.len() && keys[r] == key {
                    r += 1;
                }
                let count = (r - l) as Frequency;
                arena.push_key(stats, key, KeyStats::new(1, count, count * count));
                l = r;
            }
        }
    }

    // presence enumeration happens outside the lock, over the distinct keys
    let mut distinct = mem::take(&mut buffer.keys);
    distinct.dedup();
    if !shared.disable_unwindowed {
        buffer.mark_presence(&distinct, suitable);
    }
    buffer.pairs.sort_unstable();
    buffer.triples.sort_unstable();
    let presence_df: DocFrequency = if shared.disable_unwindowed { 0 } else { 1 };

    {
        let mut target = shared.target.lock();
        let MergeTarget { stats, arena } = &mut *target;
        if let Some(arena) = arena.as_mut() {
            let pairs = &buffer.pairs;
            let mut l = 0;
            while l < pairs.len() {
                let (pair, min_gap) = pairs[l];
                // presence markers carry an infinite gap; windowed records
                // are always finite, so counting finite gaps in the run
                // gives the windowed co-occurrence count
                let mut windowed = (min_gap != INFINITE_DIST) as Frequency;
                let mut r = l + 1;
                while r < pairs.len() && pairs[r].0 == pair {
                    windowed += (pairs[r].1 != INFINITE_DIST) as Frequency;
                    r += 1;
                }
                arena.push_pair(
                    stats,
                    pair,
                    KeyPairStats::new(
                        presence_df,
                        (windowed > 0) as DocFrequency,
                        windowed,
                        windowed * windowed,
                        min_gap,
                    ),
                );
                l = r;
            }

            let triples = &buffer.triples;
            let mut l = 0;
            while l < triples.len() {
                let (triple, min_gap) = triples[l];
                let mut windowed = (min_gap != INFINITE_DIST) as Frequency;
                let mut r = l + 1;
                while r < triples.len() && triples[r].0 == triple {
                    windowed += (triples[r].1 != INFINITE_DIST) as Frequency;
                    r += 1;
                }
                arena.push_triple(
                    stats,
                    triple,
                    KeyTripleStats::new(
                        presence_df,
                        (windowed > 0) as DocFrequency,
                        windowed,
                        windowed * windowed,
                        min_gap,
                    ),
                );
                l = r;
            }
        }
    }

    buffer.clear();
    distinct.clear();
    buffer.keys = distinct;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::TokenMatcher;
    use crate::stats::StatsConfig;

    struct Rng {
        state: u64,
    }

    impl Rng {
        fn new(seed: u64) -> Self {
            Self { state: seed.max(1) }
        }

        fn next(&mut self) -> u64 {
            let mut x = self.state;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.state = x;
            x
        }
    }

    const VOCAB: &[&str] = &["a", "b", "c", "d", "e"];

    fn matcher() -> Arc<TokenMatcher<u32>> {
        let mut m = TokenMatcher::new();
        for (i, token) in VOCAB.iter().enumerate() {
            m.insert(token, i as u32 + 1);
        }
        Arc::new(m)
    }

    fn random_docs(seed: u64, count: usize) -> Vec<String> {
        let mut rng = Rng::new(seed);
        (0..count)
            .map(|_| {
                let len = 1 + (rng.next() % 12) as usize;
                let words: Vec<&str> = (0..len)
                    .map(|_| VOCAB[(rng.next() % VOCAB.len() as u64) as usize])
                    .collect();
                words.join(" ")
            })
            .collect()
    }

    fn run(
        docs: &[String],
        stats_config: StatsConfig,
        filler_config: FillerConfig,
    ) -> CollectionStats<u32> {
        let filler = CollectionStatsFiller::new(
            CollectionStats::new(stats_config),
            matcher(),
            filler_config,
        )
        .unwrap();
        for doc in docs {
            filler.update_blocking(vec![doc.clone()]);
        }
        filler.finish()
    }

    fn windows_4_6() -> StatsConfig {
        StatsConfig {
            pair_window: 4,
            triple_window: 6,
            ..StatsConfig::default()
        }
    }

    #[test]
    fn single_document_counts_match_hand_computation() {
        // "a b a": a=1, b=2
        let stats = run(
            &["a b a".to_string()],
            StatsConfig::default(),
            FillerConfig::default(),
        );

        assert_eq!(stats.num_docs(), 1);
        assert_eq!(stats.key_stats(1), KeyStats::new(1, 2, 4));
        assert_eq!(stats.key_stats(2), KeyStats::new(1, 1, 1));
        assert_eq!(stats.key_frequency_sum(), 3);

        // a..b at gap 0 and b..a at gap 0
        assert_eq!(stats.pair_stats(1, 2), KeyPairStats::new(1, 1, 2, 4, 0));
        // a..a spans the document once, presence derived from the singleton
        assert_eq!(stats.pair_stats(1, 1), KeyPairStats::new(1, 1, 1, 1, 1));
        assert_eq!(stats.pair_window_co_occ_sum(), 3);

        assert_eq!(
            stats.triple_stats(1, 1, 2),
            KeyTripleStats::new(1, 1, 1, 1, 0)
        );
        assert_eq!(stats.triple_window_co_occ_sum(), 1);
        assert_eq!(stats.num_triples(), 1);
    }

    #[test]
    fn narrow_windows_leave_presence_only_entries() {
        // with pair window 2, the two "a" occurrences (span 3) are out of
        // window but the self-pair is still present in the document
        let stats = run(
            &["a b a".to_string()],
            StatsConfig {
                pair_window: 2,
                triple_window: 3,
                ..StatsConfig::default()
            },
            FillerConfig::default(),
        );

        assert_eq!(stats.pair_stats(1, 2), KeyPairStats::new(1, 1, 2, 4, 0));
        assert_eq!(
            stats.pair_stats(1, 1),
            KeyPairStats::new(1, 0, 0, 0, INFINITE_DIST)
        );
        assert_eq!(
            stats.triple_stats(1, 1, 2),
            KeyTripleStats::new(1, 1, 1, 1, 0)
        );
        assert_eq!(stats.pair_window_co_occ_sum(), 2);
        assert_eq!(stats.triple_window_co_occ_sum(), 1);
    }

    #[test]
    fn multi_field_documents_share_presence_but_not_windows() {
        // fields are windowed separately but presence is per document
        let filler = CollectionStatsFiller::new(
            CollectionStats::new(StatsConfig::default()),
            matcher(),
            FillerConfig::default(),
        )
        .unwrap();
        filler.update(vec!["a b".to_string(), "c".to_string()]);
        let stats = filler.finish();

        assert_eq!(stats.num_docs(), 1);
        assert_eq!(stats.pair_stats(1, 2).window_frequency, 1);
        // a and c never share a field, so no windowed count, only presence
        let cross = stats.pair_stats(1, 3);
        assert_eq!(cross.document_frequency, 1);
        assert_eq!(cross.window_frequency, 0);
        assert_eq!(cross.window_min_dist, INFINITE_DIST);
        assert_eq!(stats.triple_stats(1, 2, 3).document_frequency, 1);
        assert_eq!(stats.triple_stats(1, 2, 3).window_frequency, 0);
    }

    #[test]
    fn buffered_strategy_matches_direct() {
        let docs = random_docs(0x5EED, 40);
        let direct = run(&docs, windows_4_6(), FillerConfig::default());
        let buffered = run(
            &docs,
            windows_4_6(),
            FillerConfig {
                strategy: MergeStrategy::Buffered { buffer_bytes: 1 << 12 },
                ..FillerConfig::default()
            },
        );
        assert_eq!(direct, buffered);
    }

    #[test]
    fn results_are_independent_of_thread_count() {
        let docs = random_docs(42, 60);
        let reference = run(&docs, windows_4_6(), FillerConfig::default());
        for config in [
            FillerConfig {
                num_threads: 4,
                queue_capacity: 2,
                strategy: MergeStrategy::Direct,
            },
            FillerConfig {
                num_threads: 4,
                queue_capacity: 8,
                // small enough to force mid-stream flushes
                strategy: MergeStrategy::Buffered { buffer_bytes: 256 },
            },
            FillerConfig {
                num_threads: 2,
                queue_capacity: 1,
                strategy: MergeStrategy::Buffered { buffer_bytes: 1 << 16 },
            },
        ] {
            assert_eq!(run(&docs, windows_4_6(), config), reference);
        }
    }

    #[test]
    fn disable_unwindowed_skips_presence_tracking() {
        let config = StatsConfig {
            pair_window: 4,
            triple_window: 6,
            disable_unwindowed: true,
            ..StatsConfig::default()
        };
        let stats = run(&["a b".to_string()], config, FillerConfig::default());

        let pair = stats.pair_stats(1, 2);
        assert_eq!(pair.document_frequency, 0);
        assert_eq!(pair.window_document_frequency, 1);
        assert_eq!(pair.window_frequency, 1);

        // and the buffered reduction agrees
        let buffered = run(
            &["a b".to_string()],
            config,
            FillerConfig {
                strategy: MergeStrategy::Buffered { buffer_bytes: 1 << 12 },
                ..FillerConfig::default()
            },
        );
        assert_eq!(stats, buffered);
    }

    #[test]
    fn window_boundary_separates_presence_from_co_occurrence() {
        // "a" and "b" are 5 words apart end to end
        let doc = vec!["a x x x b".to_string()];
        let wide = run(
            &doc,
            StatsConfig {
                pair_window: 5,
                triple_window: 5,
                ..StatsConfig::default()
            },
            FillerConfig::default(),
        );
        assert_eq!(wide.pair_stats(1, 2), KeyPairStats::new(1, 1, 1, 1, 3));

        let narrow = run(
            &doc,
            StatsConfig {
                pair_window: 4,
                triple_window: 4,
                ..StatsConfig::default()
            },
            FillerConfig::default(),
        );
        // out of the window: present in the document but never co-occurring
        assert_eq!(
            narrow.pair_stats(1, 2),
            KeyPairStats::new(1, 0, 0, 0, INFINITE_DIST)
        );
    }

    #[test]
    fn split_corpus_merges_to_the_single_run_result() {
        let docs = random_docs(7, 30);
        let whole = run(&docs, windows_4_6(), FillerConfig::default());

        let mut left = run(&docs[..15], windows_4_6(), FillerConfig::default());
        let right = run(&docs[15..], windows_4_6(), FillerConfig::default());
        left.merge(&right).unwrap();
        assert_eq!(left, whole);
    }

    #[test]
    fn restricted_filler_tracks_only_declared_entries() {
        let stats_config = StatsConfig {
            restricted: true,
            ..StatsConfig::default()
        };
        let filler = CollectionStatsFiller::new(
            CollectionStats::new(stats_config),
            matcher(),
            FillerConfig::default(),
        )
        .unwrap();
        filler.add_restriction_key(1).unwrap();
        filler.add_restriction_pair(1, 2).unwrap();
        filler.update(vec!["a b c".to_string()]);
        let stats = filler.finish();

        assert_eq!(stats.key_stats(1), KeyStats::new(1, 1, 1));
        assert_eq!(stats.key_stats(2), KeyStats::default());
        assert_eq!(stats.key_stats(3), KeyStats::default());
        assert_eq!(stats.pair_stats(1, 2), KeyPairStats::new(1, 1, 1, 1, 0));
        assert_eq!(stats.pair_stats(2, 3), KeyPairStats::default());
        assert_eq!(stats.num_keys(), 1);
        assert_eq!(stats.num_pairs(), 1);
        assert_eq!(stats.num_triples(), 0);
    }

    #[test]
    fn restricted_triple_declaration_covers_derived_entries() {
        let stats_config = StatsConfig {
            restricted: true,
            ..StatsConfig::default()
        };
        let filler = CollectionStatsFiller::new(
            CollectionStats::new(stats_config),
            matcher(),
            FillerConfig::default(),
        )
        .unwrap();
        filler.add_restriction_triple(1, 1, 2).unwrap();
        filler.update(vec!["a b a".to_string()]);
        let stats = filler.finish();

        assert_eq!(
            stats.triple_stats(1, 1, 2),
            KeyTripleStats::new(1, 1, 1, 1, 0)
        );
        // the promoted pair (1, 2) backs the degenerate derivation
        assert_eq!(stats.pair_stats(1, 2).document_frequency, 1);
    }

    #[test]
    fn restriction_phase_errors() {
        let unrestricted = CollectionStatsFiller::new(
            CollectionStats::<u32>::new(StatsConfig::default()),
            matcher(),
            FillerConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            unrestricted.add_restriction_key(1),
            Err(StatsError::NotRestricted)
        ));
        drop(unrestricted);

        let restricted = CollectionStatsFiller::new(
            CollectionStats::<u32>::new(StatsConfig {
                restricted: true,
                ..StatsConfig::default()
            }),
            matcher(),
            FillerConfig::default(),
        )
        .unwrap();
        restricted.add_restriction_key(1).unwrap();
        restricted.update(vec!["a".to_string()]);
        assert!(matches!(
            restricted.add_restriction_key(2),
            Err(StatsError::RestrictionsClosed)
        ));
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        let make = |config: FillerConfig| {
            CollectionStatsFiller::new(
                CollectionStats::<u32>::new(StatsConfig::default()),
                matcher(),
                config,
            )
        };
        assert!(matches!(
            make(FillerConfig {
                num_threads: 0,
                ..FillerConfig::default()
            }),
            Err(StatsError::NoWorkerThreads)
        ));
        assert!(matches!(
            make(FillerConfig {
                queue_capacity: 0,
                ..FillerConfig::default()
            }),
            Err(StatsError::ZeroQueueCapacity)
        ));
        assert!(matches!(
            make(FillerConfig {
                strategy: MergeStrategy::Buffered { buffer_bytes: 1 },
                ..FillerConfig::default()
            }),
            Err(StatsError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn empty_documents_are_ignored() {
        let filler = CollectionStatsFiller::new(
            CollectionStats::<u32>::new(StatsConfig::default()),
            matcher(),
            FillerConfig::default(),
        )
        .unwrap();
        filler.update(Vec::new());
        filler.update(vec!["a".to_string()]);
        filler.update_blocking(Vec::new());
        let stats = filler.finish();
        assert_eq!(stats.num_docs(), 1);
    }

    #[test]
    fn flush_makes_all_submitted_documents_visible() {
        let docs = random_docs(3, 25);
        let filler = CollectionStatsFiller::new(
            CollectionStats::<u32>::new(windows_4_6()),
            matcher(),
            FillerConfig {
                num_threads: 3,
                queue_capacity: 4,
                strategy: MergeStrategy::Buffered { buffer_bytes: 512 },
            },
        )
        .unwrap();
        for doc in &docs {
            filler.update_blocking(vec![doc.clone()]);
        }
        filler.flush();
        let stats = filler.finish();
        assert_eq!(stats.num_docs(), 25);
    }
}
