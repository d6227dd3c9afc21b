//! Fixed-width binary codec: typed put/get primitives plus a byte-budget
//! guard against oversized allocations from untrusted input.
//!
//! Every value on the wire is little-endian and occupies exactly
//! [`FixedWidth::WIDTH`] bytes, so readers can raise their allowance by
//! `count * WIDTH` before trusting a size field read from the stream.

use std::io::{self, Read, Write};

use crate::error::StatsError;

/// A value with a fixed serialized byte width.
pub trait FixedWidth: Sized {
    const WIDTH: usize;

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()>;
    fn decode<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self>;
}

macro_rules! fixed_width_int {
    ($($ty:ty),*) => {
        $(
            impl FixedWidth for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
                    writer.write_all(&self.to_le_bytes())
                }

                #[inline]
                fn decode<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    reader.read_exact(&mut buf)?;
                    Ok(<$ty>::from_le_bytes(buf))
                }
            }
        )*
    };
}

fixed_width_int!(u8, u16, u32, u64, i8, i16, i32, i64);

impl FixedWidth for bool {
    const WIDTH: usize = 1;

    #[inline]
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        (*self as u8).encode(writer)
    }

    #[inline]
    fn decode<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(u8::decode(reader)? != 0)
    }
}

/// Thin typed wrapper over a `Write` sink.
pub struct RecordWriter<W> {
    inner: W,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    #[inline]
    pub fn put<T: FixedWidth>(&mut self, value: &T) -> io::Result<()> {
        value.encode(&mut self.inner)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Typed reader with an escalating byte budget.
///
/// The budget starts at the caller-supplied allowance and must be raised with
/// [`increase_budget`](Self::increase_budget) before any size field read from
/// the stream is acted upon; a read past the current allowance fails instead
/// of letting a corrupt count drive unbounded work.
pub struct BoundedReader<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> BoundedReader<R> {
    pub fn new(inner: R, initial_budget: u64) -> Self {
        Self {
            inner,
            remaining: initial_budget,
        }
    }

    /// Raise the cumulative allowance by `additional` bytes.
    pub fn increase_budget(&mut self, additional: u64) {
        self.remaining = self.remaining.saturating_add(additional);
    }

    pub fn get<T: FixedWidth>(&mut self) -> Result<T, StatsError> {
        let needed = T::WIDTH as u64;
        if self.remaining < needed {
            return Err(StatsError::ReadBudgetExceeded {
                needed,
                remaining: self.remaining,
            });
        }
        let value = T::decode(&mut self.inner).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                StatsError::TruncatedStream
            } else {
                StatsError::Io(err)
            }
        })?;
        self.remaining -= needed;
        Ok(value)
    }
}
