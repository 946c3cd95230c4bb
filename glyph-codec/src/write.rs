//! Big-endian serialization of glyph records.

use types::F2Dot14;

/// A type that can be written out as part of a glyph record.
pub(crate) trait FontWrite {
    /// Write our data into this [TableWriter].
    fn write_into(&self, writer: &mut TableWriter);
}

/// A growable buffer of serialized bytes.
#[derive(Debug, Default)]
pub(crate) struct TableWriter {
    data: Vec<u8>,
}

impl TableWriter {
    pub(crate) fn write_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes)
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn pad_to_2byte_aligned(&mut self) {
        if self.data.len() % 2 != 0 {
            self.data.push(0);
        }
    }

    pub(crate) fn into_data(self) -> Vec<u8> {
        self.data
    }
}

macro_rules! write_be_bytes {
    ($ty:ty) => {
        impl FontWrite for $ty {
            #[inline]
            fn write_into(&self, writer: &mut TableWriter) {
                writer.write_slice(&self.to_be_bytes())
            }
        }
    };
}

write_be_bytes!(u8);
write_be_bytes!(i8);
write_be_bytes!(u16);
write_be_bytes!(i16);
write_be_bytes!(u32);
write_be_bytes!(i32);

impl FontWrite for F2Dot14 {
    fn write_into(&self, writer: &mut TableWriter) {
        self.to_bits().write_into(writer)
    }
}

impl<T: FontWrite> FontWrite for [T] {
    fn write_into(&self, writer: &mut TableWriter) {
        self.iter().for_each(|item| item.write_into(writer))
    }
}

impl<T: FontWrite, const N: usize> FontWrite for [T; N] {
    fn write_into(&self, writer: &mut TableWriter) {
        self.as_slice().write_into(writer)
    }
}

impl<T: FontWrite> FontWrite for Vec<T> {
    fn write_into(&self, writer: &mut TableWriter) {
        self.as_slice().write_into(writer)
    }
}

/// Serialize a value into a new byte vector.
pub(crate) fn dump<T: FontWrite + ?Sized>(value: &T) -> Vec<u8> {
    let mut writer = TableWriter::default();
    value.write_into(&mut writer);
    writer.into_data()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_and_padding() {
        let mut writer = TableWriter::default();
        (-2i16).write_into(&mut writer);
        [1u8, 2, 3].write_into(&mut writer);
        writer.pad_to_2byte_aligned();
        assert_eq!(writer.len(), 6);
        assert_eq!(writer.into_data(), [0xFF, 0xFE, 1, 2, 3, 0]);
    }
}
