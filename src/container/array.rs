use std::{borrow::Cow, fmt::Debug, io};

use bytes::BufMut;
use itertools::Itertools;
use zerocopy::{IntoBytes, LE, U16};

use crate::{
    codec::{Codec, CodecErr, CodecMode, Encodable, read_exact},
    traits::ContainerRead,
    view::{Element, TypedView},
};

/// A sparse container: the sorted, unique values of one 65536 value chunk.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ArrayContainer {
    content: Vec<u16>,
}

impl Debug for ArrayContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ArrayContainer({})", self.cardinality())
    }
}

impl ArrayContainer {
    pub const EMPTY: Self = ArrayContainer { content: Vec::new() };

    #[inline(always)]
    pub const fn encoded_size(cardinality: usize) -> usize {
        cardinality * size_of::<u16>()
    }

    /// Allocate zeroed storage for `cardinality` values, ready to be filled
    /// by [`ArrayContainer::read_from`].
    pub fn with_cardinality(cardinality: usize) -> Result<Self, CodecErr> {
        let cardinality = CodecErr::ensure_cardinality(cardinality)?;
        Ok(Self { content: vec![0; cardinality] })
    }

    /// Resize the storage to hold exactly `cardinality` values. Existing
    /// values are kept up to the new length; new slots are zero.
    pub fn set_cardinality(&mut self, cardinality: usize) -> Result<(), CodecErr> {
        let cardinality = CodecErr::ensure_cardinality(cardinality)?;
        self.content.resize(cardinality, 0);
        Ok(())
    }

    /// Construct an `ArrayContainer` from a sorted iter of unique values.
    /// Correctness of later lookups depends on the input being sorted and
    /// free of duplicates; this is not checked.
    pub fn from_sorted_unique_unchecked(values: impl IntoIterator<Item = u16>) -> Self {
        ArrayContainer { content: values.into_iter().collect() }
    }

    #[inline]
    pub fn content(&self) -> &[u16] {
        &self.content
    }

    /// Write the payload using the process-wide [`Codec`].
    pub fn write_to<W: io::Write>(&self, dst: W) -> io::Result<usize> {
        Codec::global().write_array(self, dst)
    }

    /// Fill the pre-sized storage from `src` using the process-wide [`Codec`].
    /// See [`Codec::read_array`].
    pub fn read_from<R: io::Read>(&mut self, src: R) -> Result<usize, CodecErr> {
        Codec::global().read_array(self, src)
    }
}

impl FromIterator<u16> for ArrayContainer {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self::from_sorted_unique_unchecked(iter.into_iter().sorted_unstable().dedup())
    }
}

impl Encodable for ArrayContainer {
    #[inline]
    fn encoded_size(&self) -> usize {
        Self::encoded_size(self.content.len())
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        for &value in &self.content {
            buf.put_u16_le(value);
        }
    }
}

impl ContainerRead for ArrayContainer {
    #[inline]
    fn cardinality(&self) -> usize {
        self.content.len()
    }

    fn contains(&self, value: u16) -> bool {
        self.content.binary_search(&value).is_ok()
    }

    fn last(&self) -> Option<u16> {
        self.content.last().copied()
    }

    fn iter(&self) -> impl Iterator<Item = u16> {
        self.content.iter().copied()
    }
}

/// An array container decoded from an in-memory buffer. Borrows the buffer
/// for `'a` when decoded by a zero-copy [`Codec`].
#[derive(Debug, Clone)]
pub struct ArrayRef<'a> {
    content: TypedView<'a, U16<LE>>,
}

impl<'a> ArrayRef<'a> {
    /// Decode using the process-wide [`Codec`]. See [`Codec::decode_array`].
    pub fn decode_from_buffer(
        data: &'a [u8],
        cardinality: usize,
    ) -> Result<(Self, &'a [u8]), CodecErr> {
        Codec::global().decode_array(data, cardinality)
    }

    #[inline]
    pub fn content(&self) -> &TypedView<'a, U16<LE>> {
        &self.content
    }

    #[inline]
    pub fn is_aliased(&self) -> bool {
        self.content.is_aliased()
    }

    /// Detach from the source buffer.
    pub fn into_owned(self) -> ArrayContainer {
        ArrayContainer { content: self.content.into_vec() }
    }
}

impl ContainerRead for ArrayRef<'_> {
    #[inline]
    fn cardinality(&self) -> usize {
        self.content.len()
    }

    fn contains(&self, value: u16) -> bool {
        match &self.content {
            TypedView::Aliased(values) => values.binary_search_by_key(&value, |v| v.get()).is_ok(),
            TypedView::Copied(values) => values.binary_search(&value).is_ok(),
        }
    }

    fn last(&self) -> Option<u16> {
        self.content.last()
    }

    fn iter(&self) -> impl Iterator<Item = u16> {
        self.content.iter()
    }
}

impl PartialEq<ArrayContainer> for ArrayRef<'_> {
    fn eq(&self, other: &ArrayContainer) -> bool {
        self.content.len() == other.content.len() && self.content.iter().eq(other.iter())
    }
}

impl PartialEq<ArrayRef<'_>> for ArrayContainer {
    #[inline]
    fn eq(&self, other: &ArrayRef<'_>) -> bool {
        other == self
    }
}

impl Codec {
    /// The little-endian payload of `container`: its own storage when
    /// zero-copy, a freshly encoded buffer otherwise.
    pub fn array_le_bytes<'c>(&self, container: &'c ArrayContainer) -> Cow<'c, [u8]> {
        match self.mode() {
            CodecMode::ZeroCopy => Cow::Borrowed(container.content.as_bytes()),
            CodecMode::Portable => {
                let mut buf = Vec::with_capacity(container.encoded_size());
                container.encode(&mut buf);
                Cow::Owned(buf)
            }
        }
    }

    /// Write the values of `container` as little-endian `u16`s, returning the
    /// number of bytes written. Writer errors are returned unchanged.
    pub fn write_array<W: io::Write>(
        &self,
        container: &ArrayContainer,
        mut dst: W,
    ) -> io::Result<usize> {
        let bytes = self.array_le_bytes(container);
        dst.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Fill the storage of `container` from `src`.
    ///
    /// The container must already be sized to the expected cardinality (see
    /// [`ArrayContainer::with_cardinality`]); the payload carries no length.
    /// On [`CodecErr::ShortRead`] the container holds undefined partial
    /// content.
    pub fn read_array<R: io::Read>(
        &self,
        container: &mut ArrayContainer,
        src: R,
    ) -> Result<usize, CodecErr> {
        match self.mode() {
            CodecMode::ZeroCopy => read_exact(src, container.content.as_mut_bytes()),
            CodecMode::Portable => {
                let mut buf = vec![0; ArrayContainer::encoded_size(container.content.len())];
                let read = read_exact(src, &mut buf)?;
                for (value, bytes) in container.content.iter_mut().zip(buf.chunks_exact(2)) {
                    *value = U16::<LE>::decode_portable(bytes);
                }
                Ok(read)
            }
        }
    }

    /// Decode `cardinality` values from the front of `data`, returning the
    /// container and the unconsumed remainder.
    pub fn decode_array<'a>(
        &self,
        data: &'a [u8],
        cardinality: usize,
    ) -> Result<(ArrayRef<'a>, &'a [u8]), CodecErr> {
        let cardinality = CodecErr::ensure_cardinality(cardinality)?;
        let len = ArrayContainer::encoded_size(cardinality);
        CodecErr::ensure_bytes_available(data, len)?;
        let (content, rest) = data.split_at(len);
        Ok((ArrayRef { content: TypedView::from_bytes(self, content) }, rest))
    }
}
