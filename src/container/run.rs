//! Interval pair views for run container payloads.
//!
//! Only view construction lives here. Whether `length` counts values or
//! values minus one is decided by the run container that consumes the view.

use bytes::BufMut;
use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, LE, U16, Unaligned};

use crate::{
    codec::{Codec, CodecErr, Encodable},
    view::{Element, TypedView, view},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: u16,
    pub length: u16,
}

impl Interval {
    #[inline]
    pub const fn new(start: u16, length: u16) -> Self {
        Self { start, length }
    }
}

#[derive(Debug, IntoBytes, FromBytes, Unaligned, KnownLayout, Immutable, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct EncodedInterval {
    start: U16<LE>,
    length: U16<LE>,
}

const_assert_eq!(size_of::<EncodedInterval>(), 4);

impl EncodedInterval {
    #[inline]
    pub fn start(&self) -> u16 {
        self.start.get()
    }

    #[inline]
    pub fn length(&self) -> u16 {
        self.length.get()
    }
}

impl Element for EncodedInterval {
    type Native = Interval;

    #[inline]
    fn to_native(self) -> Interval {
        Interval { start: self.start.get(), length: self.length.get() }
    }

    #[inline]
    fn from_native(native: Interval) -> Self {
        Self {
            start: U16::new(native.start),
            length: U16::new(native.length),
        }
    }

    #[inline]
    fn decode_portable(bytes: &[u8]) -> Interval {
        Interval {
            start: U16::<LE>::decode_portable(&bytes[0..2]),
            length: U16::<LE>::decode_portable(&bytes[2..4]),
        }
    }
}

impl From<Interval> for EncodedInterval {
    #[inline]
    fn from(interval: Interval) -> Self {
        Self::from_native(interval)
    }
}

impl From<&EncodedInterval> for Interval {
    #[inline]
    fn from(encoded: &EncodedInterval) -> Self {
        encoded.to_native()
    }
}

/// Interval pairs decoded from a run container payload.
pub type IntervalsRef<'a> = TypedView<'a, EncodedInterval>;

/// Reinterpret `bytes` as `bytes.len() / 4` interval pairs without copying.
///
/// # Panics
/// If `bytes.len()` is not a multiple of 4.
#[track_caller]
#[inline]
pub fn interval_view(bytes: &[u8]) -> &[EncodedInterval] {
    view(bytes)
}

pub fn encode_intervals<B: BufMut>(intervals: &[Interval], buf: &mut B) {
    for interval in intervals {
        buf.put_u16_le(interval.start);
        buf.put_u16_le(interval.length);
    }
}

impl Encodable for [Interval] {
    #[inline]
    fn encoded_size(&self) -> usize {
        self.len() * size_of::<EncodedInterval>()
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        encode_intervals(self, buf);
    }
}

impl Codec {
    /// View all of `bytes` as interval pairs using the configured path.
    ///
    /// # Panics
    /// If `bytes.len()` is not a multiple of 4.
    #[track_caller]
    pub fn decode_intervals<'a>(&self, bytes: &'a [u8]) -> IntervalsRef<'a> {
        TypedView::from_bytes(self, bytes)
    }

    /// Decode `num_runs` interval pairs from the front of `data`, returning
    /// them along with the unconsumed remainder.
    pub fn decode_runs<'a>(
        &self,
        data: &'a [u8],
        num_runs: usize,
    ) -> Result<(IntervalsRef<'a>, &'a [u8]), CodecErr> {
        // a run container never holds more runs than values
        let num_runs = CodecErr::ensure_cardinality(num_runs)?;
        let len = num_runs * size_of::<EncodedInterval>();
        CodecErr::ensure_bytes_available(data, len)?;
        let (runs, rest) = data.split_at(len);
        Ok((self.decode_intervals(runs), rest))
    }
}
