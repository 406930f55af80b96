use std::{borrow::Cow, fmt::Debug, io};

use bitvec::{bitbox, boxed::BitBox, order::Lsb0};
use bytes::BufMut;
use zerocopy::{IntoBytes, LE, U64};

use crate::{
    BITMAP_BYTES, BITMAP_WORDS, MAX_CARDINALITY,
    codec::{Codec, CodecErr, CodecMode, Encodable, read_exact},
    traits::ContainerRead,
    view::{Element, TypedView},
};

/// Counts the set bits across `words`.
#[inline]
pub fn popcount(words: impl IntoIterator<Item = u64>) -> usize {
    words.into_iter().map(|w| w.count_ones() as usize).sum()
}

/// Iterate the values whose bits are set in the `word_idx`-th word.
fn word_ones(word_idx: usize, mut word: u64) -> impl Iterator<Item = u16> {
    let base = word_idx * u64::BITS as usize;
    std::iter::from_fn(move || {
        (word != 0).then(|| {
            let bit = word.trailing_zeros() as usize;
            word &= word - 1;
            (base + bit) as u16
        })
    })
}

/// A dense container: one bit per value of the 65536 value chunk, stored as
/// 1024 `u64` words with a cached cardinality.
#[derive(Clone, Eq)]
pub struct BitmapContainer {
    bitmap: BitBox<u64, Lsb0>,
    cardinality: usize,
}

impl BitmapContainer {
    pub const ENCODED_SIZE: usize = BITMAP_BYTES;

    pub fn full() -> Self {
        Self {
            bitmap: bitbox![u64, Lsb0; 1; MAX_CARDINALITY],
            cardinality: MAX_CARDINALITY,
        }
    }

    #[inline]
    pub fn words(&self) -> &[u64] {
        self.bitmap.as_raw_slice()
    }

    /// Inserts the value, returning `true` if it was not already present.
    pub fn insert(&mut self, value: u16) -> bool {
        let inserted = !self.bitmap.replace(value.into(), true);
        self.cardinality += usize::from(inserted);
        inserted
    }

    /// Removes the value, returning `true` if it was present.
    pub fn remove(&mut self, value: u16) -> bool {
        let removed = self.bitmap.replace(value.into(), false);
        self.cardinality -= usize::from(removed);
        removed
    }

    /// Write the payload using the process-wide [`Codec`].
    pub fn write_to<W: io::Write>(&self, dst: W) -> io::Result<usize> {
        Codec::global().write_bitmap(self, dst)
    }

    /// Overwrite the words from `src` using the process-wide [`Codec`].
    /// See [`Codec::read_bitmap`].
    pub fn read_from<R: io::Read>(&mut self, src: R) -> Result<usize, CodecErr> {
        Codec::global().read_bitmap(self, src)
    }

    fn recompute_cardinality(&mut self) {
        self.cardinality = popcount(self.words().iter().copied());
    }
}

impl Default for BitmapContainer {
    fn default() -> Self {
        Self {
            bitmap: bitbox![u64, Lsb0; 0; MAX_CARDINALITY],
            cardinality: 0,
        }
    }
}

impl Debug for BitmapContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BitmapContainer({})", self.cardinality)
    }
}

impl FromIterator<u16> for BitmapContainer {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        let mut container = Self::default();
        for value in iter {
            container.bitmap.set(value.into(), true);
        }
        container.recompute_cardinality();
        container
    }
}

impl PartialEq for BitmapContainer {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bitmap == other.bitmap
    }
}

impl Encodable for BitmapContainer {
    #[inline]
    fn encoded_size(&self) -> usize {
        Self::ENCODED_SIZE
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        for &word in self.words() {
            buf.put_u64_le(word);
        }
    }
}

impl ContainerRead for BitmapContainer {
    #[inline]
    fn cardinality(&self) -> usize {
        self.cardinality
    }

    #[inline]
    fn contains(&self, value: u16) -> bool {
        self.bitmap[usize::from(value)]
    }

    fn last(&self) -> Option<u16> {
        self.bitmap.last_one().map(|idx| idx as u16)
    }

    fn iter(&self) -> impl Iterator<Item = u16> {
        self.bitmap.iter_ones().map(|idx| idx as u16)
    }
}

/// A bitmap container decoded from an in-memory buffer, with its
/// cardinality computed at decode time.
#[derive(Debug, Clone)]
pub struct BitmapRef<'a> {
    words: TypedView<'a, U64<LE>>,
    cardinality: usize,
}

impl<'a> BitmapRef<'a> {
    /// Decode using the process-wide [`Codec`]. See [`Codec::decode_bitmap`].
    pub fn decode_from_buffer(data: &'a [u8]) -> Result<(Self, &'a [u8]), CodecErr> {
        Codec::global().decode_bitmap(data)
    }

    #[inline]
    pub fn words(&self) -> &TypedView<'a, U64<LE>> {
        &self.words
    }

    #[inline]
    pub fn is_aliased(&self) -> bool {
        self.words.is_aliased()
    }

    /// Detach from the source buffer.
    pub fn into_owned(self) -> BitmapContainer {
        let words = self.words.into_vec().into_boxed_slice();
        debug_assert_eq!(words.len(), BITMAP_WORDS);
        BitmapContainer {
            bitmap: BitBox::from_boxed_slice(words),
            cardinality: self.cardinality,
        }
    }
}

impl ContainerRead for BitmapRef<'_> {
    #[inline]
    fn cardinality(&self) -> usize {
        self.cardinality
    }

    fn contains(&self, value: u16) -> bool {
        let (word, bit) = (usize::from(value) / 64, u32::from(value) % 64);
        self.words.get(word).is_some_and(|w| w & (1 << bit) != 0)
    }

    fn last(&self) -> Option<u16> {
        (0..self.words.len()).rev().find_map(|idx| {
            let word = self.words.get(idx)?;
            (word != 0).then(|| (idx * 64 + 63 - word.leading_zeros() as usize) as u16)
        })
    }

    fn iter(&self) -> impl Iterator<Item = u16> {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(idx, word)| word_ones(idx, word))
    }
}

impl PartialEq<BitmapContainer> for BitmapRef<'_> {
    fn eq(&self, other: &BitmapContainer) -> bool {
        self.words.iter().eq(other.words().iter().copied())
    }
}

impl PartialEq<BitmapRef<'_>> for BitmapContainer {
    #[inline]
    fn eq(&self, other: &BitmapRef<'_>) -> bool {
        other == self
    }
}

impl Codec {
    /// The 8192 byte little-endian payload of `container`: its own word
    /// storage when zero-copy, a freshly encoded buffer otherwise.
    pub fn bitmap_le_bytes<'c>(&self, container: &'c BitmapContainer) -> Cow<'c, [u8]> {
        match self.mode() {
            CodecMode::ZeroCopy => Cow::Borrowed(container.words().as_bytes()),
            CodecMode::Portable => {
                let mut buf = Vec::with_capacity(BITMAP_BYTES);
                container.encode(&mut buf);
                Cow::Owned(buf)
            }
        }
    }

    /// Write all 1024 words of `container`, returning the number of bytes
    /// written. Writer errors are returned unchanged.
    pub fn write_bitmap<W: io::Write>(
        &self,
        container: &BitmapContainer,
        mut dst: W,
    ) -> io::Result<usize> {
        let bytes = self.bitmap_le_bytes(container);
        dst.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Overwrite the words of `container` with exactly 8192 bytes from `src`
    /// and recompute its cardinality.
    ///
    /// On [`CodecErr::ShortRead`] the words hold undefined partial content;
    /// the cached cardinality still matches whatever words are present.
    pub fn read_bitmap<R: io::Read>(
        &self,
        container: &mut BitmapContainer,
        src: R,
    ) -> Result<usize, CodecErr> {
        let result = match self.mode() {
            CodecMode::ZeroCopy => {
                read_exact(src, container.bitmap.as_raw_mut_slice().as_mut_bytes())
            }
            CodecMode::Portable => {
                let mut buf = vec![0; BITMAP_BYTES];
                read_exact(src, &mut buf).map(|read| {
                    let words = container.bitmap.as_raw_mut_slice();
                    for (word, bytes) in words.iter_mut().zip(buf.chunks_exact(8)) {
                        *word = U64::<LE>::decode_portable(bytes);
                    }
                    read
                })
            }
        };
        container.recompute_cardinality();
        result
    }

    /// Decode a bitmap from the first 8192 bytes of `data`, returning the
    /// container and the unconsumed remainder.
    pub fn decode_bitmap<'a>(
        &self,
        data: &'a [u8],
    ) -> Result<(BitmapRef<'a>, &'a [u8]), CodecErr> {
        CodecErr::ensure_bytes_available(data, BITMAP_BYTES)?;
        let (words, rest) = data.split_at(BITMAP_BYTES);
        let words = TypedView::<U64<LE>>::from_bytes(self, words);
        let cardinality = popcount(words.iter());
        Ok((BitmapRef { words, cardinality }, rest))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use assert_matches::assert_matches;
    use itertools::Itertools;
    use proptest::{collection::vec, prelude::*};

    use super::{BitmapContainer, BitmapRef, popcount};
    use crate::{
        BITMAP_BYTES, MAX_CARDINALITY,
        codec::{Codec, CodecErr, Encodable},
        testutil::{FailingWriter, SetGen, codecs, test_container_read},
        traits::ContainerRead,
    };

    #[test]
    fn test_decode_all_zero() {
        let buf = vec![0u8; BITMAP_BYTES];
        for codec in codecs() {
            let (bitmap, rest) = codec.decode_bitmap(&buf).unwrap();
            assert_eq!(bitmap.cardinality(), 0);
            assert!(bitmap.is_empty());
            assert_eq!(bitmap.last(), None);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn test_decode_all_ones() {
        let buf = vec![0xFFu8; BITMAP_BYTES + 3];
        for codec in codecs() {
            let (bitmap, rest) = codec.decode_bitmap(&buf).unwrap();
            assert_eq!(bitmap.cardinality(), MAX_CARDINALITY);
            assert_eq!(bitmap.last(), Some(u16::MAX));
            assert_eq!(rest.len(), 3);
            assert_eq!(bitmap.into_owned(), BitmapContainer::full());
        }
    }

    #[test]
    fn test_decode_short_buffer() {
        let buf = vec![0xAAu8; BITMAP_BYTES - 1];
        let before = buf.clone();
        for codec in codecs() {
            assert_matches!(
                codec.decode_bitmap(&buf),
                Err(CodecErr::ShortBuffer { needed: 8192, available: 8191 })
            );
            assert_eq!(buf, before);
        }
    }

    #[test]
    fn test_write_bit_layout() {
        let container = BitmapContainer::from_iter([0, 9, 64, u16::MAX]);
        for codec in codecs() {
            let mut out = vec![];
            assert_eq!(codec.write_bitmap(&container, &mut out).unwrap(), 8192);
            assert_eq!(out.len(), 8192);
            assert_eq!(out[0], 0b0000_0001);
            assert_eq!(out[1], 0b0000_0010);
            assert_eq!(out[8], 0b0000_0001);
            assert_eq!(out[8191], 0b1000_0000);
            assert_eq!(popcount(out.iter().map(|&b| u64::from(b))), 4);
        }
    }

    #[test]
    fn test_read_recomputes_cardinality() {
        let source = BitmapContainer::from_iter((0..1000).map(|v| v * 7));
        let buf = source.encode_to_bytes();
        for codec in codecs() {
            let mut container = BitmapContainer::from_iter([1, 2, 3, 60000]);
            assert_eq!(codec.read_bitmap(&mut container, &buf[..]).unwrap(), 8192);
            assert_eq!(container.cardinality(), 1000);
            assert_eq!(container, source);
        }
    }

    #[test]
    fn test_read_short() {
        let buf = [0xFFu8; 100];
        for codec in codecs() {
            let mut container = BitmapContainer::default();
            assert_matches!(
                codec.read_bitmap(&mut container, &buf[..]),
                Err(CodecErr::ShortRead { needed: 8192 })
            );
            assert_eq!(
                container.cardinality(),
                popcount(container.words().iter().copied())
            );
        }
    }

    #[test]
    fn test_write_error_propagates() {
        let container = BitmapContainer::full();
        for codec in codecs() {
            let err = codec.write_bitmap(&container, FailingWriter).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        }
    }

    #[test]
    fn test_insert_remove_cardinality() {
        let mut container = BitmapContainer::default();
        assert!(container.insert(5));
        assert!(!container.insert(5));
        assert!(container.insert(u16::MAX));
        assert_eq!(container.cardinality(), 2);
        assert!(container.contains(5));

        assert!(container.remove(5));
        assert!(!container.remove(5));
        assert_eq!(container.cardinality(), 1);
        assert!(!container.contains(5));

        let mut full = BitmapContainer::full();
        assert!(full.remove(0));
        assert_eq!(full.cardinality(), MAX_CARDINALITY - 1);
    }

    #[test]
    fn test_zero_copy_aliases_buffer() {
        let Some(codec) = Codec::zero_copy() else {
            return;
        };
        let container = BitmapContainer::from_iter([3, 1000]);
        let buf = container.encode_to_bytes();
        let (bitmap, _) = codec.decode_bitmap(&buf).unwrap();
        assert!(bitmap.is_aliased());
        let (bitmap, _) = Codec::portable().decode_bitmap(&buf).unwrap();
        assert!(!bitmap.is_aliased());

        assert_eq!(
            codec.bitmap_le_bytes(&container).as_ptr(),
            container.words().as_ptr().cast()
        );
    }

    #[test]
    fn test_global_codec_helpers() {
        let container = BitmapContainer::from_iter([11, 22, 33]);
        let mut out = vec![];
        assert_eq!(container.write_to(&mut out).unwrap(), BITMAP_BYTES);

        let mut read = BitmapContainer::default();
        assert_eq!(read.read_from(out.as_slice()).unwrap(), BITMAP_BYTES);
        assert_eq!(read, container);

        let (bitmap, rest) = BitmapRef::decode_from_buffer(&out).unwrap();
        assert!(rest.is_empty());
        assert_eq!(bitmap, container);
    }

    #[test]
    fn test_bitmap_read() {
        let mut setgen = SetGen::new(0xDEAD_BEEF);
        let sets = [
            vec![],
            vec![0],
            vec![u16::MAX],
            setgen.random(64),
            setgen.random(8192),
            setgen.runs(16384, 0.5),
        ];
        for set in sets {
            let container = BitmapContainer::from_iter(set.iter().copied());
            test_container_read(&container, &set);

            let buf = container.encode_to_bytes();
            for codec in codecs() {
                let (bitmap, _) = codec.decode_bitmap(&buf).unwrap();
                test_container_read(&bitmap, &set);
                assert_eq!(bitmap.into_owned(), container);
            }
        }
    }

    proptest! {
        #[test]
        fn test_decode_cardinality_is_popcount(words in vec(any::<u64>(), 1024)) {
            let buf = words.iter().flat_map(|w| w.to_le_bytes()).collect_vec();
            let expected: usize = words.iter().map(|w| w.count_ones() as usize).sum();
            for codec in codecs() {
                let (bitmap, rest) = codec.decode_bitmap(&buf).unwrap();
                prop_assert!(rest.is_empty());
                prop_assert_eq!(bitmap.cardinality(), expected);
                prop_assert_eq!(bitmap.words().to_vec(), words.clone());

                let mut container = BitmapContainer::default();
                codec.read_bitmap(&mut container, buf.as_slice()).unwrap();
                prop_assert_eq!(container.cardinality(), expected);
                prop_assert_eq!(container.words(), words.as_slice());
            }
        }

        #[test]
        fn test_modes_write_identical(values in vec(any::<u16>(), 0..4096)) {
            let container = BitmapContainer::from_iter(values);
            let outputs = codecs()
                .into_iter()
                .map(|codec| {
                    let mut out = vec![];
                    codec.write_bitmap(&container, &mut out).unwrap();
                    out
                })
                .collect_vec();
            prop_assert!(outputs.iter().all_equal());
            prop_assert_eq!(outputs[0].as_slice(), &container.encode_to_bytes()[..]);
        }
    }
}
