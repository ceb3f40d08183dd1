//! A Godot-aware read/write cursor.
//!
//! Wraps [`gdpack_core`]'s generic [`DataCursorRef`]/[`DataCursorMut`] with the two file-wide flags
//! every Godot binary format carries: the byte order, and whether `real_t` (Godot's vector/transform
//! component type) is 32-bit or 64-bit. This plays the same role as the Panda3D module's `Datagram`
//! wrapper this crate is adapted from, which carries an analogous `float_type` flag.

use gdpack_core::prelude::*;
use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("{source}"))]
    Data { source: gdpack_core::data::Error },
    #[snafu(display("Invalid UTF-8 in length-prefixed string"))]
    InvalidUtf8,
}

impl From<gdpack_core::data::Error> for Error {
    #[inline]
    fn from(source: gdpack_core::data::Error) -> Self {
        Self::Data { source }
    }
}

type Result<T> = core::result::Result<T, Error>;

/// A borrowed, read-only Godot byte stream.
pub struct GodotReader<'a> {
    cursor: DataCursorRef<'a>,
    real_is_64: bool,
}

impl<'a> GodotReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8], endian: Endian, real_is_64: bool) -> Self {
        Self { cursor: DataCursorRef::new(data, endian), real_is_64 }
    }

    #[must_use]
    pub fn real_is_64(&self) -> bool {
        self.real_is_64
    }

    pub fn set_real_is_64(&mut self, value: bool) {
        self.real_is_64 = value;
    }

    /// Reads `real_t`: an `f32` or `f64` depending on the stream's flag, always returned widened
    /// to `f64` for ease of arithmetic.
    pub fn read_real(&mut self) -> Result<f64> {
        Ok(if self.real_is_64 { self.cursor.read_f64()? } else { f64::from(self.cursor.read_f32()?) })
    }

    /// Reads a `u32` length, that many bytes, and interprets them as UTF-8 up to the first NUL,
    /// per `spec.md` §4.1's `get_length_prefixed_utf8`. The length includes the NUL terminator.
    pub fn read_length_prefixed_utf8(&mut self) -> Result<String> {
        let length = self.cursor.read_u32()? as usize;
        if length == 0 {
            return Ok(String::new());
        }
        let bytes = self.cursor.get_slice(length)?;
        let text = core::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?;
        let end = text.find('\0').unwrap_or(text.len());
        Ok(text[..end].to_owned())
    }

    /// Advances the cursor to the next multiple of four bytes, relative to the start of the
    /// stream.
    pub fn align4(&mut self) -> Result<()> {
        let remainder = self.cursor.position() % 4;
        if remainder != 0 {
            self.cursor.get_slice(4 - remainder)?;
        }
        Ok(())
    }
}

impl<'a> core::ops::Deref for GodotReader<'a> {
    type Target = DataCursorRef<'a>;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.cursor
    }
}

impl core::ops::DerefMut for GodotReader<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cursor
    }
}

/// A growable, append-only byte buffer used to build the binary form of a resource or pack. None
/// of the cursor types in `gdpack_core::data` grow, since they're designed around fixed-size
/// in-memory files; serialization needs to build output of a size that isn't known up front.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buffer: Vec<u8>,
    endian: Endian,
    real_is_64: bool,
}

impl ByteWriter {
    #[must_use]
    pub fn new(endian: Endian, real_is_64: bool) -> Self {
        Self { buffer: Vec::new(), endian, real_is_64 }
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        let bytes = match self.endian {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        };
        self.write_bytes(&bytes);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    pub fn write_u64(&mut self, value: u64) {
        let bytes = match self.endian {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        };
        self.write_bytes(&bytes);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_u64(value as u64);
    }

    pub fn write_f32(&mut self, value: f32) {
        let bytes = match self.endian {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        };
        self.write_bytes(&bytes);
    }

    pub fn write_f64(&mut self, value: f64) {
        let bytes = match self.endian {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        };
        self.write_bytes(&bytes);
    }

    pub fn write_real(&mut self, value: f64) {
        if self.real_is_64 {
            self.write_f64(value);
        } else {
            self.write_f32(value as f32);
        }
    }

    /// Writes a `u32` length (including the NUL terminator) followed by the UTF-8 bytes and a
    /// trailing NUL, mirroring [`GodotReader::read_length_prefixed_utf8`].
    pub fn write_length_prefixed_utf8(&mut self, text: &str) {
        let length = text.len() as u32 + 1;
        self.write_u32(length);
        self.write_bytes(text.as_bytes());
        self.write_u8(0);
    }

    pub fn align4(&mut self) {
        let remainder = self.buffer.len() % 4;
        if remainder != 0 {
            self.buffer.resize(self.buffer.len() + (4 - remainder), 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_length_prefixed_string() {
        let mut writer = ByteWriter::new(Endian::Little, false);
        writer.write_length_prefixed_utf8("resource_name");
        let bytes = writer.into_inner();

        let mut reader = GodotReader::new(&bytes, Endian::Little, false);
        assert_eq!(reader.read_length_prefixed_utf8().unwrap(), "resource_name");
    }

    #[test]
    fn real_width_follows_flag() {
        let mut writer = ByteWriter::new(Endian::Little, true);
        writer.write_real(1.5);
        let bytes = writer.into_inner();
        assert_eq!(bytes.len(), 8);

        let mut reader = GodotReader::new(&bytes, Endian::Little, true);
        assert_eq!(reader.read_real().unwrap(), 1.5);
    }

    #[test]
    fn align4_advances_to_next_boundary() {
        let mut reader = GodotReader::new(&[0u8; 8], Endian::Little, false);
        reader.get_slice(3).unwrap();
        reader.align4().unwrap();
        assert_eq!(reader.position(), 4);
    }
}
