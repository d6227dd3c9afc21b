use std::sync::Arc;

use cooccur_stats::{
    CollectionStats, CollectionStatsFiller, FillerConfig, StatsConfig, TokenMatcher,
};

fn main() {
    // build a matcher over a small vocabulary
    let mut matcher = TokenMatcher::new();
    for (i, token) in ["rust", "fast", "parallel", "safe", "flexible"]
        .iter()
        .enumerate()
    {
        matcher.insert(token, i as u32 + 1);
    }

    // feed documents through the filler
    let stats = CollectionStats::new(StatsConfig::default());
    let filler =
        CollectionStatsFiller::new(stats, Arc::new(matcher), FillerConfig::default()).unwrap();
    filler.update(vec!["rust fast parallel rust".to_string()]);
    filler.update(vec!["rust flexible safe rust".to_string()]);
    let stats = filler.finish();

    // query
    println!("docs: {}", stats.num_docs());
    println!("key 1 (rust): {:?}", stats.key_stats(1));
    println!("pair (rust, fast): {:?}", stats.pair_stats(1, 2));
    println!("triple (rust, fast, parallel): {:?}", stats.triple_stats(1, 2, 3));

    // round-trip through the binary format
    let path = std::env::temp_dir().join("cooccur-stats-basic.bin");
    stats.dump(&path).unwrap();
    let loaded = CollectionStats::<u32>::load(&path, false, false).unwrap();
    println!("loaded == built: {}", loaded == stats);
    // debug
    println!("{:?}", loaded.config());
}
