use std::sync::Arc;

use cooccur_stats::{
    CollectionStats, CollectionStatsFiller, FillerConfig, StatsConfig, TokenMatcher,
};

fn matcher() -> Arc<TokenMatcher<u32>> {
    let mut matcher = TokenMatcher::new();
    for (i, token) in ["rust", "fast", "parallel", "safe", "abstract"]
        .iter()
        .enumerate()
    {
        matcher.insert(token, i as u32 + 1);
    }
    Arc::new(matcher)
}

fn fill(docs: &[&str]) -> CollectionStats<u32> {
    let stats = CollectionStats::new(StatsConfig::default());
    let filler =
        CollectionStatsFiller::new(stats, matcher(), FillerConfig::default()).unwrap();
    for doc in docs {
        filler.update(vec![doc.to_string()]);
    }
    filler.finish()
}

fn main() {
    // fill two shards independently
    let mut shard0 = fill(&["rust fast parallel rust", "rust safe fast"]);
    let shard1 = fill(&["rust fast safe abstract"]);

    // merge shards
    shard0.merge(&shard1).unwrap();

    // print result
    println!("docs: {}", shard0.num_docs());
    println!("key 1 (rust): {:?}", shard0.key_stats(1));
    println!("pair (rust, fast): {:?}", shard0.pair_stats(1, 2));
    // debug
    println!("keys: {}, pairs: {}, triples: {}",
        shard0.num_keys(), shard0.num_pairs(), shard0.num_triples());
}
