//! Interface to the pattern-matching engine that produces the match stream
//! this crate aggregates. Tokenization/matching itself is out of scope; any
//! engine honoring the ordering contract can drive a
//! [`CollectionStatsFiller`](crate::CollectionStatsFiller).

use std::collections::HashMap;

use ahash::RandomState;

use crate::stats::key::Key;

/// One pattern occurrence inside a text field.
///
/// `end_pos` is the word offset of the last word covered by the pattern; the
/// start offset is derived as `end_pos + 1 - pattern_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch<K> {
    pub pattern: K,
    pub end_pos: usize,
}

/// A pattern-matching engine.
///
/// Contract: `find_patterns` appends matches sorted by ascending `end_pos`,
/// ties broken by decreasing pattern length. The extraction algorithm relies
/// on this ordering for its monotonic no-overlap cursor.
pub trait PatternMatcher<K: Key>: Send + Sync {
    fn find_patterns(&self, text: &str, out: &mut Vec<PatternMatch<K>>);

    /// Length, in words, of the given pattern.
    fn pattern_length(&self, pattern: K) -> usize;
}

/// Minimal matcher over a vocabulary of single whitespace-separated tokens.
///
/// Every pattern has length 1 and matches at its word offset, which trivially
/// satisfies the ordering contract. Used by the tests and as a reference
/// implementation; real deployments plug in a proper multi-word matcher.
#[derive(Debug, Clone, Default)]
pub struct TokenMatcher<K> {
    vocabulary: HashMap<Box<str>, K, RandomState>,
}

impl<K: Key> TokenMatcher<K> {
    pub fn new() -> Self {
        Self {
            vocabulary: HashMap::with_hasher(RandomState::new()),
        }
    }

    pub fn insert(&mut self, token: &str, key: K) {
        self.vocabulary.insert(token.into(), key);
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }
}

impl<K: Key> PatternMatcher<K> for TokenMatcher<K> {
    fn find_patterns(&self, text: &str, out: &mut Vec<PatternMatch<K>>) {
        for (pos, token) in text.split_whitespace().enumerate() {
            if let Some(&key) = self.vocabulary.get(token) {
                out.push(PatternMatch {
                    pattern: key,
                    end_pos: pos,
                });
            }
        }
    }

    fn pattern_length(&self, _pattern: K) -> usize {
        1
    }
}
