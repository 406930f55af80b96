use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;
use tracing::trace;

use crate::MAX_CARDINALITY;

pub mod mode;

pub use mode::{Capabilities, Codec, CodecMode, ConfigErr};

/// A container payload with a fixed little-endian wire encoding.
///
/// Encoding always composes values through [`BufMut`], so it is correct on
/// every host regardless of the configured [`CodecMode`].
pub trait Encodable {
    fn encoded_size(&self) -> usize;

    fn encode<B: BufMut>(&self, buf: &mut B);

    fn encode_to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_size());
        self.encode(&mut buf);
        debug_assert_eq!(buf.len(), self.encoded_size());
        buf.freeze()
    }
}

#[derive(Debug, Error)]
pub enum CodecErr {
    /// An in-memory decode was handed fewer bytes than it requires. The input
    /// buffer is left untouched.
    #[error("short buffer: needed {needed} bytes, {available} available")]
    ShortBuffer { needed: usize, available: usize },

    /// A stream ended before the preallocated storage was filled. The
    /// destination container holds undefined partial content.
    #[error("short read: stream ended before {needed} bytes were read")]
    ShortRead { needed: usize },

    #[error("cardinality {0} exceeds the 65536 value container universe")]
    Cardinality(usize),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CodecErr {
    #[inline]
    pub(crate) fn ensure_bytes_available(data: &[u8], len: usize) -> Result<(), CodecErr> {
        if data.len() < len {
            trace!(needed = len, available = data.len(), "short buffer");
            Err(Self::ShortBuffer { needed: len, available: data.len() })
        } else {
            Ok(())
        }
    }

    /// Rejects externally supplied element counts before they are used in
    /// any size arithmetic.
    #[inline]
    pub(crate) fn ensure_cardinality(cardinality: usize) -> Result<usize, CodecErr> {
        if cardinality > MAX_CARDINALITY {
            Err(Self::Cardinality(cardinality))
        } else {
            Ok(cardinality)
        }
    }
}

/// Fill `buf` completely from `src`, mapping EOF to [`CodecErr::ShortRead`].
pub(crate) fn read_exact<R: io::Read>(mut src: R, buf: &mut [u8]) -> Result<usize, CodecErr> {
    match src.read_exact(buf) {
        Ok(()) => Ok(buf.len()),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
            trace!(needed = buf.len(), "short read");
            Err(CodecErr::ShortRead { needed: buf.len() })
        }
        Err(err) => Err(err.into()),
    }
}
