//! Zero-copy codecs for the fixed-width container payloads of a Roaring style
//! compressed bitmap.
//!
//! ## Containers
//!
//! - **Array**: the sorted, unique `u16` members of a sparse chunk, encoded as
//!   `N * 2` little-endian bytes. `N` is carried by the parent format.
//! - **Bitmap**: 1024 little-endian `u64` words (8192 bytes); bit `i` of word
//!   `w` marks value `64 * w + i`.
//! - **Run**: `(start, length)` pairs of little-endian `u16`s, 4 bytes each.
//!   Only the view over these pairs lives in this crate.
//!
//! ## Zero-copy and portable paths
//!
//! A [`Codec`] is either zero-copy, aliasing container storage and input
//! buffers directly, or portable, copying value by value with explicit
//! little-endian composition. Both produce identical bytes and values. The
//! zero-copy path is only available on hosts whose [`Capabilities`] pass the
//! gate; [`Codec::global`] resolves the choice once per process.
//!
//! Decoded views such as [`ArrayRef`] borrow their source buffer, so the
//! borrow checker guarantees a view never outlives its backing storage. Use
//! `into_owned` to detach.
//!
//! ```
//! use roaring_container_codec::{ArrayContainer, Codec, ContainerRead};
//!
//! let codec = Codec::detect();
//! let container = ArrayContainer::from_iter([1, 3, u16::MAX]);
//!
//! let mut buf = vec![];
//! codec.write_array(&container, &mut buf).unwrap();
//! assert_eq!(buf, [0x01, 0x00, 0x03, 0x00, 0xFF, 0xFF]);
//!
//! let (array, rest) = codec.decode_array(&buf, 3).unwrap();
//! assert!(rest.is_empty());
//! assert!(array.contains(3));
//! assert_eq!(array.into_owned(), container);
//! ```

pub mod codec;
pub mod container;
pub mod traits;
pub mod view;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use codec::{Capabilities, Codec, CodecErr, CodecMode, ConfigErr, Encodable};
pub use container::{
    ArrayContainer, ArrayRef, BitmapContainer, BitmapRef, EncodedInterval, Interval,
    IntervalsRef, interval_view,
};
pub use traits::ContainerRead;
pub use view::{Element, TypedView};

/// The number of values in a container's universe, `0..=u16::MAX`.
pub const MAX_CARDINALITY: usize = 1 << 16;

/// The number of `u64` words in a bitmap container.
pub const BITMAP_WORDS: usize = MAX_CARDINALITY / u64::BITS as usize;

/// The encoded size of a bitmap container.
pub const BITMAP_BYTES: usize = BITMAP_WORDS * size_of::<u64>();
