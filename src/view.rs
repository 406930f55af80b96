//! Typed views over little-endian byte buffers.
//!
//! Every element type is a zerocopy [`Unaligned`] little-endian wrapper, so a
//! view can be taken over any byte slice without alignment requirements. The
//! only precondition is that the slice length is a whole number of elements;
//! anything else is a caller bug and panics at construction.

use std::fmt::Debug;

use either::Either;
use zerocopy::{
    ConvertError, FromBytes, Immutable, IntoBytes, KnownLayout, LE, U16, U64, Unaligned,
};

use crate::codec::{Codec, CodecMode};

/// A fixed-width little-endian wire element.
pub trait Element: FromBytes + IntoBytes + Unaligned + Immutable + KnownLayout + Copy + Debug {
    type Native: Copy + Debug + PartialEq;

    const WIDTH: usize = size_of::<Self>();

    fn to_native(self) -> Self::Native;

    fn from_native(native: Self::Native) -> Self;

    /// Assemble a native value from exactly `WIDTH` little-endian bytes
    /// without reinterpreting memory.
    fn decode_portable(bytes: &[u8]) -> Self::Native;
}

impl Element for U16<LE> {
    type Native = u16;

    #[inline]
    fn to_native(self) -> u16 {
        self.get()
    }

    #[inline]
    fn from_native(native: u16) -> Self {
        U16::new(native)
    }

    #[inline]
    fn decode_portable(bytes: &[u8]) -> u16 {
        u16::from(bytes[0]) | (u16::from(bytes[1]) << 8)
    }
}

impl Element for U64<LE> {
    type Native = u64;

    #[inline]
    fn to_native(self) -> u64 {
        self.get()
    }

    #[inline]
    fn from_native(native: u64) -> Self {
        U64::new(native)
    }

    #[inline]
    fn decode_portable(bytes: &[u8]) -> u64 {
        bytes[..8]
            .iter()
            .rev()
            .fold(0, |acc, &byte| (acc << 8) | u64::from(byte))
    }
}

#[track_caller]
#[inline]
fn check_width<E: Element>(len: usize) {
    assert!(
        len % E::WIDTH == 0,
        "invalid alignment: buffer length {len} is not a multiple of the {} byte element width",
        E::WIDTH
    );
}

/// Reinterpret `bytes` as `bytes.len() / E::WIDTH` elements without copying.
///
/// # Panics
/// If `bytes.len()` is not a multiple of `E::WIDTH`.
#[track_caller]
pub fn view<E: Element>(bytes: &[u8]) -> &[E] {
    check_width::<E>(bytes.len());
    match <[E]>::ref_from_bytes(bytes) {
        Ok(elements) => elements,
        Err(ConvertError::Alignment(_)) => panic!("All zerocopy transmutations must be unaligned"),
        Err(ConvertError::Size(_)) => unreachable!("length is a multiple of the element width"),
        Err(ConvertError::Validity(never)) => match never {},
    }
}

/// The byte view of `elements`, `elements.len() * E::WIDTH` bytes.
#[inline]
pub fn as_bytes<E: Element>(elements: &[E]) -> &[u8] {
    elements.as_bytes()
}

/// Decode `bytes` element by element into fresh storage.
///
/// # Panics
/// If `bytes.len()` is not a multiple of `E::WIDTH`.
#[track_caller]
pub fn copy_elements<E: Element>(bytes: &[u8]) -> Vec<E::Native> {
    check_width::<E>(bytes.len());
    bytes.chunks_exact(E::WIDTH).map(E::decode_portable).collect()
}

/// A decoded element sequence: either aliasing the source buffer for `'a`,
/// or a copy produced by the portable codec.
#[derive(Debug, Clone)]
pub enum TypedView<'a, E: Element> {
    Aliased(&'a [E]),
    Copied(Vec<E::Native>),
}

impl<'a, E: Element> TypedView<'a, E> {
    /// Build a view over `bytes` using the codec's configured path.
    ///
    /// # Panics
    /// If `bytes.len()` is not a multiple of `E::WIDTH`.
    #[track_caller]
    pub fn from_bytes(codec: &Codec, bytes: &'a [u8]) -> Self {
        match codec.mode() {
            CodecMode::ZeroCopy => Self::Aliased(view(bytes)),
            CodecMode::Portable => Self::Copied(copy_elements::<E>(bytes)),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Aliased(elements) => elements.len(),
            Self::Copied(values) => values.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_aliased(&self) -> bool {
        matches!(self, Self::Aliased(_))
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<E::Native> {
        match self {
            Self::Aliased(elements) => elements.get(idx).map(|e| e.to_native()),
            Self::Copied(values) => values.get(idx).copied(),
        }
    }

    #[inline]
    pub fn last(&self) -> Option<E::Native> {
        self.len().checked_sub(1).and_then(|idx| self.get(idx))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = E::Native> + '_ {
        match self {
            Self::Aliased(elements) => Either::Left(elements.iter().map(|e| e.to_native())),
            Self::Copied(values) => Either::Right(values.iter().copied()),
        }
    }

    pub fn to_vec(&self) -> Vec<E::Native> {
        self.iter().collect()
    }

    pub fn into_vec(self) -> Vec<E::Native> {
        match self {
            Self::Aliased(_) => self.to_vec(),
            Self::Copied(values) => values,
        }
    }
}

impl<E: Element> PartialEq for TypedView<'_, E> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

#[cfg(test)]
mod tests {
    use proptest::{collection::vec, prelude::*};
    use zerocopy::{LE, U16, U64};

    use super::{Element, TypedView, as_bytes, copy_elements, view};
    use crate::{codec::Codec, container::run::EncodedInterval};

    #[test]
    fn test_view_u16() {
        let bytes = [0x01, 0x00, 0x03, 0x00, 0xFF, 0xFF];
        let values = view::<U16<LE>>(&bytes);
        assert_eq!(values.len(), 3);
        assert_eq!(
            values.iter().map(|v| v.get()).collect::<Vec<_>>(),
            vec![1, 3, u16::MAX]
        );
        assert_eq!(as_bytes(values), &bytes);
        assert_eq!(as_bytes(values).as_ptr(), bytes.as_ptr());
    }

    #[test]
    fn test_view_u64() {
        let mut bytes = [0u8; 16];
        bytes[0] = 0x01;
        bytes[15] = 0x80;
        let words = view::<U64<LE>>(&bytes);
        assert_eq!(words[0].get(), 1);
        assert_eq!(words[1].get(), 1 << 63);
    }

    #[test]
    fn test_view_unaligned_offset() {
        let bytes = [0xAA, 0x34, 0x12, 0x78, 0x56];
        let values = view::<U16<LE>>(&bytes[1..]);
        assert_eq!(values[0].get(), 0x1234);
        assert_eq!(values[1].get(), 0x5678);
    }

    #[test]
    fn test_empty_view() {
        assert!(view::<U16<LE>>(&[]).is_empty());
        assert!(view::<U64<LE>>(&[]).is_empty());
        assert!(view::<EncodedInterval>(&[]).is_empty());
    }

    #[test]
    #[should_panic(expected = "invalid alignment")]
    fn test_view_u16_invalid_length() {
        view::<U16<LE>>(&[0; 3]);
    }

    #[test]
    #[should_panic(expected = "invalid alignment")]
    fn test_view_interval_invalid_length() {
        view::<EncodedInterval>(&[0; 6]);
    }

    #[test]
    #[should_panic(expected = "invalid alignment")]
    fn test_view_u64_invalid_length() {
        view::<U64<LE>>(&[0; 12]);
    }

    #[test]
    #[should_panic(expected = "invalid alignment")]
    fn test_copy_invalid_length() {
        copy_elements::<U64<LE>>(&[0; 7]);
    }

    #[test]
    fn test_every_width_rejects_misaligned_lengths() {
        fn rejects<E: Element>(len: usize) -> bool {
            let bytes = vec![0u8; len];
            let aliased = std::panic::catch_unwind(|| view::<E>(&bytes).len()).is_err();
            let copied = std::panic::catch_unwind(|| copy_elements::<E>(&bytes).len()).is_err();
            assert_eq!(aliased, copied, "paths disagree for len {len}");
            aliased
        }

        for len in 0..=32 {
            assert_eq!(rejects::<U16<LE>>(len), len % 2 != 0, "width 2, len {len}");
            assert_eq!(rejects::<EncodedInterval>(len), len % 4 != 0, "width 4, len {len}");
            assert_eq!(rejects::<U64<LE>>(len), len % 8 != 0, "width 8, len {len}");
        }
    }

    #[test]
    fn test_typed_view_modes() {
        let bytes = [0x05, 0x00, 0x00, 0x01];
        let copied = TypedView::<U16<LE>>::from_bytes(&Codec::portable(), &bytes);
        assert!(!copied.is_aliased());
        assert_eq!(copied.to_vec(), vec![5, 0x100]);
        assert_eq!(copied.last(), Some(0x100));
        assert_eq!(copied.get(2), None);

        if let Some(codec) = Codec::zero_copy() {
            let aliased = TypedView::<U16<LE>>::from_bytes(&codec, &bytes);
            assert!(aliased.is_aliased());
            assert_eq!(aliased, copied);
            assert_eq!(aliased.into_vec(), copied.into_vec());
        }
    }

    proptest! {
        #[test]
        fn test_portable_matches_view_u16(bytes in vec(any::<u8>(), 0..256)) {
            let bytes = &bytes[..bytes.len() / 2 * 2];
            let aliased: Vec<u16> = view::<U16<LE>>(bytes).iter().map(|v| v.get()).collect();
            prop_assert_eq!(aliased, copy_elements::<U16<LE>>(bytes));
        }

        #[test]
        fn test_portable_matches_view_u64(bytes in vec(any::<u8>(), 0..512)) {
            let bytes = &bytes[..bytes.len() / 8 * 8];
            let aliased: Vec<u64> = view::<U64<LE>>(bytes).iter().map(|v| v.get()).collect();
            prop_assert_eq!(aliased, copy_elements::<U64<LE>>(bytes));
        }

        #[test]
        fn test_native_round_trip(words in vec(any::<u64>(), 0..64)) {
            let encoded: Vec<U64<LE>> = words.iter().copied().map(U64::from_native).collect();
            prop_assert_eq!(copy_elements::<U64<LE>>(as_bytes(&encoded)), words);
        }
    }
}
