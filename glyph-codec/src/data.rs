//! Bounds-checked big-endian reading of glyph data.

use types::F2Dot14;

/// An error that occurs when reading past the end of a glyph program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct OutOfBounds;

/// A type that can be read from raw big-endian bytes.
pub(crate) trait ReadScalar: Sized {
    /// The number of bytes occupied by this type.
    const RAW_BYTE_LEN: usize;

    fn read(bytes: &[u8]) -> Option<Self>;
}

macro_rules! int_scalar {
    ($ty:ty) => {
        impl ReadScalar for $ty {
            const RAW_BYTE_LEN: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn read(bytes: &[u8]) -> Option<Self> {
                bytes
                    .get(..Self::RAW_BYTE_LEN)
                    .and_then(|raw| raw.try_into().ok())
                    .map(<$ty>::from_be_bytes)
            }
        }
    };
}

int_scalar!(u8);
int_scalar!(i8);
int_scalar!(u16);
int_scalar!(i16);
int_scalar!(u32);
int_scalar!(i32);

impl ReadScalar for F2Dot14 {
    const RAW_BYTE_LEN: usize = 2;

    #[inline]
    fn read(bytes: &[u8]) -> Option<Self> {
        i16::read(bytes).map(F2Dot14::from_bits)
    }
}

/// A cursor for sequential reads over a byte slice.
#[derive(Clone, Debug)]
pub(crate) struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn read<T: ReadScalar>(&mut self) -> Result<T, OutOfBounds> {
        let value = self
            .bytes
            .get(self.pos..)
            .and_then(T::read)
            .ok_or(OutOfBounds)?;
        self.pos += T::RAW_BYTE_LEN;
        Ok(value)
    }

    pub(crate) fn read_array(&mut self, len: usize) -> Result<&'a [u8], OutOfBounds> {
        let end = self.pos.checked_add(len).ok_or(OutOfBounds)?;
        let slice = self.bytes.get(self.pos..end).ok_or(OutOfBounds)?;
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining_bytes(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }
}
