//! Binary persistence for [`CollectionStats`].
//!
//! Layout, all little-endian:
//!
//! ```text
//! u64  key width in bytes
//! bool disable_unwindowed
//! bool restricted
//! u16  pair window
//! u16  triple window
//! u32  num_docs
//! u64  key_frequency_sum
//! u64  pair_window_co_occ_sum
//! u64  triple_window_co_occ_sum
//! u64  key entry count,    then that many (key, KeyStats) records
//! u64  pair entry count,   then that many (KeyPair, KeyPairStats) records
//! u64  triple entry count, then that many (KeyTriple, KeyTripleStats) records
//! ```
//!
//! The reader starts with an allowance covering exactly the fixed header and
//! the three count fields, and raises it per section by `count * entry width`
//! once a count has been read and validated. A corrupt count therefore fails
//! fast instead of driving an unbounded allocation.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::StatsError;
use crate::utils::codec::{BoundedReader, FixedWidth, RecordWriter};

use super::key::{Key, KeyPair, KeyTriple};
use super::record::{KeyPairStats, KeyStats, KeyTripleStats};
use super::{CollectionStats, StatsConfig};

/// Fixed header plus the three section count fields.
const HEADER_ALLOWANCE: u64 = 8 + 1 + 1 + 2 + 2 + 4 + 3 * 8 + 3 * 8;

/// Upper bound on any plausible section count; anything above this is treated
/// as stream corruption before the budget math even runs.
const MAX_SECTION_ENTRIES: u64 = 1 << 40;

impl FixedWidth for KeyStats {
    const WIDTH: usize = 4 + 8 + 8;

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        self.document_frequency.encode(writer)?;
        self.frequency.encode(writer)?;
        self.frequency_square.encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            document_frequency: FixedWidth::decode(reader)?,
            frequency: FixedWidth::decode(reader)?,
            frequency_square: FixedWidth::decode(reader)?,
        })
    }
}

impl FixedWidth for KeyPairStats {
    const WIDTH: usize = 4 + 4 + 8 + 8 + 2;

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        self.document_frequency.encode(writer)?;
        self.window_document_frequency.encode(writer)?;
        self.window_frequency.encode(writer)?;
        self.window_frequency_square.encode(writer)?;
        self.window_min_dist.encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            document_frequency: FixedWidth::decode(reader)?,
            window_document_frequency: FixedWidth::decode(reader)?,
            window_frequency: FixedWidth::decode(reader)?,
            window_frequency_square: FixedWidth::decode(reader)?,
            window_min_dist: FixedWidth::decode(reader)?,
        })
    }
}

impl FixedWidth for KeyTripleStats {
    const WIDTH: usize = 4 + 4 + 8 + 8 + 2;

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        self.document_frequency.encode(writer)?;
        self.window_document_frequency.encode(writer)?;
        self.window_frequency.encode(writer)?;
        self.window_frequency_square.encode(writer)?;
        self.window_min_dist.encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            document_frequency: FixedWidth::decode(reader)?,
            window_document_frequency: FixedWidth::decode(reader)?,
            window_frequency: FixedWidth::decode(reader)?,
            window_frequency_square: FixedWidth::decode(reader)?,
            window_min_dist: FixedWidth::decode(reader)?,
        })
    }
}

impl<K: Key + FixedWidth> FixedWidth for KeyPair<K> {
    const WIDTH: usize = 2 * K::WIDTH;

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        self.first().encode(writer)?;
        self.second().encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let first = K::decode(reader)?;
        let second = K::decode(reader)?;
        // re-canonicalize rather than trusting stored order
        Ok(KeyPair::new(first, second))
    }
}

impl<K: Key + FixedWidth> FixedWidth for KeyTriple<K> {
    const WIDTH: usize = 3 * K::WIDTH;

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        self.first().encode(writer)?;
        self.second().encode(writer)?;
        self.third().encode(writer)
    }

    fn decode<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let first = K::decode(reader)?;
        let second = K::decode(reader)?;
        let third = K::decode(reader)?;
        Ok(KeyTriple::new(first, second, third))
    }
}

impl<K: Key + FixedWidth> CollectionStats<K> {
    /// Serialize into any writer.
    pub fn dumps<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut out = RecordWriter::new(writer);
        out.put(&(K::WIDTH as u64))?;
        out.put(&self.config.disable_unwindowed)?;
        out.put(&self.config.restricted)?;
        out.put(&self.config.pair_window)?;
        out.put(&self.config.triple_window)?;
        out.put(&self.num_docs)?;
        out.put(&self.key_frequency_sum)?;
        out.put(&self.pair_window_co_occ_sum)?;
        out.put(&self.triple_window_co_occ_sum)?;

        out.put(&(self.keys.len() as u64))?;
        for (key, stats) in &self.keys {
            out.put(key)?;
            out.put(stats)?;
        }
        out.put(&(self.pairs.len() as u64))?;
        for (pair, stats) in &self.pairs {
            out.put(pair)?;
            out.put(stats)?;
        }
        out.put(&(self.triples.len() as u64))?;
        for (triple, stats) in &self.triples {
            out.put(triple)?;
            out.put(stats)?;
        }
        Ok(())
    }

    /// Serialize to a file, replacing any previous contents.
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.dumps(&mut writer)?;
        writer.flush()
    }

    /// Deserialize from a reader.
    ///
    /// `restricted` and `disable_unwindowed` are what the caller expects the
    /// stored collection to have been built with; a mismatch is an error
    /// rather than a silent reinterpretation of the counters.
    pub fn loads<R: Read>(
        reader: R,
        restricted: bool,
        disable_unwindowed: bool,
    ) -> Result<Self, StatsError> {
        let mut input = BoundedReader::new(reader, HEADER_ALLOWANCE);

        let key_width: u64 = input.get()?;
        if key_width != K::WIDTH as u64 {
            return Err(StatsError::KeyWidthMismatch {
                expected: K::WIDTH as u64,
                found: key_width,
            });
        }

        let found_disable_unwindowed: bool = input.get()?;
        let found_restricted: bool = input.get()?;
        if found_restricted != restricted || found_disable_unwindowed != disable_unwindowed {
            return Err(StatsError::FlagMismatch {
                expected_restricted: restricted,
                found_restricted,
                expected_disable_unwindowed: disable_unwindowed,
                found_disable_unwindowed,
            });
        }

        let pair_window = input.get()?;
        let triple_window = input.get()?;
        let mut stats = Self::new(StatsConfig {
            pair_window,
            triple_window,
            restricted,
            disable_unwindowed,
        });
        stats.num_docs = input.get()?;
        stats.key_frequency_sum = input.get()?;
        stats.pair_window_co_occ_sum = input.get()?;
        stats.triple_window_co_occ_sum = input.get()?;

        let num_keys = read_count(&mut input, K::WIDTH + KeyStats::WIDTH)?;
        for _ in 0..num_keys {
            let key: K = input.get()?;
            let record: KeyStats = input.get()?;
            stats.keys.insert(key, record);
        }

        let num_pairs = read_count(&mut input, KeyPair::<K>::WIDTH + KeyPairStats::WIDTH)?;
        for _ in 0..num_pairs {
            let pair: KeyPair<K> = input.get()?;
            let record: KeyPairStats = input.get()?;
            stats.pairs.insert(pair, record);
        }

        let num_triples = read_count(&mut input, KeyTriple::<K>::WIDTH + KeyTripleStats::WIDTH)?;
        for _ in 0..num_triples {
            let triple: KeyTriple<K> = input.get()?;
            let record: KeyTripleStats = input.get()?;
            stats.triples.insert(triple, record);
        }

        debug!(
            num_docs = stats.num_docs,
            num_keys,
            num_pairs,
            num_triples,
            "loaded collection statistics"
        );
        Ok(stats)
    }

    /// Deserialize from a file; see [`loads`](Self::loads) for the flag
    /// arguments.
    pub fn load<P: AsRef<Path>>(
        path: P,
        restricted: bool,
        disable_unwindowed: bool,
    ) -> Result<Self, StatsError> {
        Self::loads(
            BufReader::new(File::open(path)?),
            restricted,
            disable_unwindowed,
        )
    }
}

/// Read a section count and raise the reader's allowance by the bytes that
/// many entries will occupy.
fn read_count<R: Read>(
    input: &mut BoundedReader<R>,
    entry_width: usize,
) -> Result<u64, StatsError> {
    let count: u64 = input.get()?;
    let bytes = count
        .checked_mul(entry_width as u64)
        .filter(|_| count <= MAX_SECTION_ENTRIES)
        .ok_or(StatsError::CorruptCount(count))?;
    input.increase_budget(bytes);
    Ok(count)
}
