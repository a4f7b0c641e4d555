// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Pluggable string/byte materialization strategy used by [`crate::rx::Rx`].
//!
//! `load` reads exactly `len` bytes of a packet's variable header into the
//! decoder's own storage, discarding whatever was loaded for the previous
//! packet. `as_slice` then exposes that region so [`crate::byte_array::ByteArray`]
//! can parse every field out of it; because `ByteArray::read_bytes` returns
//! slices tied to the buffer's lifetime rather than to the `&mut ByteArray`
//! borrow, a packet's variable-header struct can hold several borrowed
//! fields (topic, client id, ...) at once without `unsafe`. Callers that
//! need a field to outlive the next `load` call must copy it.

use std::fmt;
use std::io::Read;

/// Failure from [`Decoder::load`]: either the no-alloc scratch buffer was
/// too small for the requested length, or the underlying transport read
/// failed (including a genuine mid-packet disconnect, which is distinct
/// from a malformed packet and must not be reported as one).
#[derive(Debug)]
pub enum LoadError {
    BufferExceeded,
    Io(std::io::Error),
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferExceeded => write!(f, "no-alloc decoder scratch buffer exceeded"),
            Self::Io(e) => write!(f, "transport read failed: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}

pub trait Decoder {
    /// Read exactly `len` bytes from `reader` into this decoder's storage.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::BufferExceeded`] if `len` exceeds a fixed-size
    /// decoder's capacity, or [`LoadError::Io`] wrapping the transport's
    /// read failure otherwise.
    fn load(&mut self, reader: &mut impl Read, len: usize) -> Result<(), LoadError>;

    /// The bytes most recently loaded by [`Decoder::load`].
    fn as_slice(&self) -> &[u8];

    /// Drop the loaded bytes. Not required between packets (`load`
    /// overwrites), but used by callers that want to release a no-alloc
    /// scratch buffer's contents early.
    fn reset(&mut self);
}

fn read_exact_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> Result<(), LoadError> {
    reader.read_exact(buf).map_err(LoadError::from)
}

/// Allocation-free decoder backed by a caller-supplied scratch buffer.
///
/// Size the buffer to the combined length of the largest packet's
/// non-payload string/byte fields the embedding application expects to
/// receive; `load` fails with `LoadError::BufferExceeded` otherwise.
pub struct NoAllocDecoder<'s> {
    scratch: &'s mut [u8],
    len: usize,
}

impl<'s> NoAllocDecoder<'s> {
    #[must_use]
    pub fn new(scratch: &'s mut [u8]) -> Self {
        Self { scratch, len: 0 }
    }
}

impl Decoder for NoAllocDecoder<'_> {
    fn load(&mut self, reader: &mut impl Read, len: usize) -> Result<(), LoadError> {
        if len > self.scratch.len() {
            return Err(LoadError::BufferExceeded);
        }
        read_exact_or_eof(reader, &mut self.scratch[..len])?;
        self.len = len;
        Ok(())
    }

    fn as_slice(&self) -> &[u8] {
        &self.scratch[..self.len]
    }

    fn reset(&mut self) {
        self.len = 0;
    }
}

/// Allocating decoder backed by a growable `Vec<u8>`. `load` never fails
/// with `BufferExceeded`; the only ceiling is `FixedHeader`'s
/// `0x0FFF_FFFF` remaining-length limit, enforced before `load` is called.
#[derive(Default)]
pub struct AllocDecoder {
    buf: Vec<u8>,
}

impl AllocDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }
}

impl Decoder for AllocDecoder {
    fn load(&mut self, reader: &mut impl Read, len: usize) -> Result<(), LoadError> {
        self.buf.clear();
        self.buf.resize(len, 0);
        read_exact_or_eof(reader, &mut self.buf)?;
        Ok(())
    }

    fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    fn reset(&mut self) {
        self.buf.clear();
    }
}
