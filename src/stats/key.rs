use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// An opaque, totally ordered, hashable, copyable value identifying a
/// term/pattern. Implemented automatically for any qualifying type
/// (`u32`, `u64`, interned ids, ...).
pub trait Key: Copy + Eq + Ord + Hash + Send + Sync + 'static {}

impl<T: Copy + Eq + Ord + Hash + Send + Sync + 'static> Key for T {}

/// Unordered pair of keys in canonical form: elements are sorted ascending
/// at construction, so the derived `Eq`/`Hash`/`Ord` are invariant to the
/// order the keys were supplied in. Repeated elements are allowed (a key
/// co-occurring with itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyPair<K> {
    first: K,
    second: K,
}

impl<K: Key> KeyPair<K> {
    pub fn new(a: K, b: K) -> Self {
        if b < a {
            Self { first: b, second: a }
        } else {
            Self { first: a, second: b }
        }
    }

    #[inline]
    pub fn first(&self) -> K {
        self.first
    }

    #[inline]
    pub fn second(&self) -> K {
        self.second
    }

    #[inline]
    pub fn has_repeated_element(&self) -> bool {
        self.first == self.second
    }
}

/// Unordered triple of keys, stored sorted ascending. Same canonical-form
/// contract as [`KeyPair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyTriple<K> {
    first: K,
    second: K,
    third: K,
}

impl<K: Key> KeyTriple<K> {
    pub fn new(a: K, b: K, c: K) -> Self {
        let (lo, hi) = if b < a { (b, a) } else { (a, b) };
        if c < lo {
            Self { first: c, second: lo, third: hi }
        } else if hi < c {
            Self { first: lo, second: hi, third: c }
        } else {
            Self { first: lo, second: c, third: hi }
        }
    }

    /// Insert a key into an already-canonical pair. Fast path used by the
    /// extraction inner loop, where the (l, r) pair is already built.
    pub fn with_pair(pair: KeyPair<K>, other: K) -> Self {
        if other < pair.first() {
            Self { first: other, second: pair.first(), third: pair.second() }
        } else if pair.second() < other {
            Self { first: pair.first(), second: pair.second(), third: other }
        } else {
            Self { first: pair.first(), second: other, third: pair.second() }
        }
    }

    #[inline]
    pub fn first(&self) -> K {
        self.first
    }

    #[inline]
    pub fn second(&self) -> K {
        self.second
    }

    #[inline]
    pub fn third(&self) -> K {
        self.third
    }
}
