use std::io;

use thiserror::Error;

/// Errors produced by this crate.
///
/// Configuration errors are fatal and reported immediately; there is no retry
/// anywhere in this subsystem. Querying an unknown key/pair/triple is *not*
/// an error: lookups return a zero-valued record instead.
#[derive(Debug, Error)]
pub enum StatsError {
    /// The filler was configured with an empty worker pool.
    #[error("worker thread count must be greater than zero")]
    NoWorkerThreads,

    /// The filler was configured with a zero-capacity job queue.
    #[error("job queue capacity must be greater than zero")]
    ZeroQueueCapacity,

    /// The buffered merge strategy was given a buffer that cannot hold even
    /// one record of the largest category.
    #[error("merge buffer of {got} bytes cannot hold the largest record entry ({needed} bytes)")]
    BufferTooSmall { got: usize, needed: usize },

    /// `add_restriction_*` was called on a filler bound to an unrestricted
    /// collection.
    #[error("restrictions can only be added to a restricted collection")]
    NotRestricted,

    /// `add_restriction_*` was called after document processing started.
    /// Restriction declaration and document ingestion are mutually exclusive
    /// phases.
    #[error("restrictions must be registered before any document is processed")]
    RestrictionsClosed,

    /// Two collections with different window sizes cannot be merged.
    #[error(
        "window sizes differ: ({left_pair}, {left_triple}) vs ({right_pair}, {right_triple})"
    )]
    WindowMismatch {
        left_pair: u16,
        left_triple: u16,
        right_pair: u16,
        right_triple: u16,
    },

    /// Configuration flags of a stored or merged collection do not match the
    /// requested ones.
    #[error(
        "collection flags do not match: stored restricted={found_restricted}, \
         disable_unwindowed={found_disable_unwindowed}; requested \
         restricted={expected_restricted}, disable_unwindowed={expected_disable_unwindowed}"
    )]
    FlagMismatch {
        expected_restricted: bool,
        found_restricted: bool,
        expected_disable_unwindowed: bool,
        found_disable_unwindowed: bool,
    },

    /// The serialized stream was produced for a key type of a different
    /// byte width.
    #[error("stored key width is {found} bytes, expected {expected}")]
    KeyWidthMismatch { expected: u64, found: u64 },

    /// A read went past the current byte allowance of the bounded reader.
    /// The allowance must be raised before any size field read from the
    /// stream is trusted.
    #[error("read budget exhausted: {needed} bytes requested, {remaining} allowed")]
    ReadBudgetExceeded { needed: u64, remaining: u64 },

    /// An entry count read from the stream is too large to be real.
    #[error("entry count {0} is implausibly large")]
    CorruptCount(u64),

    /// The serialized stream ended in the middle of a record.
    #[error("serialized stream ended unexpectedly")]
    TruncatedStream,

    #[error(transparent)]
    Io(#[from] io::Error),
}
