//! Converters for engine-major-2 values that have no direct modern equivalent.
//!
//! Grounded on the original engine's `compat/image_parser_v2.h` (legacy image decoding) and
//! `compat/resource_import_metadatav2.h` (the engine-2 import metadata tail section); both are
//! reached only from engine-major-2 resource files.

use gdpack_core::prelude::{DataCursorTrait, EndianRead};
use snafu::prelude::*;

use crate::stream::{ByteWriter, GodotReader};
use crate::variant::Variant;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("{source}"))]
    Stream { source: crate::stream::Error },
    #[snafu(display("Legacy image format {format} has no modern equivalent and cannot be recovered"))]
    Unavailable { format: u32 },
}

impl From<crate::stream::Error> for Error {
    #[inline]
    fn from(source: crate::stream::Error) -> Self {
        Self::Stream { source }
    }
}

impl From<gdpack_core::data::Error> for Error {
    #[inline]
    fn from(source: gdpack_core::data::Error) -> Self {
        Self::Stream { source: source.into() }
    }
}

impl crate::error::HasErrorKind for Error {
    fn kind(&self) -> crate::error::ErrorKind {
        match self {
            Self::Stream { .. } => crate::error::ErrorKind::FileCorrupt,
            Self::Unavailable { .. } => crate::error::ErrorKind::Unavailable,
        }
    }
}

type Result<T> = core::result::Result<T, Error>;

/// The engine-2 pixel-format enum, as read from a `VARIANT_IMAGE` payload. Values beyond this set
/// exist in the original engine but have no pixel layout this crate can reconstruct; they surface
/// as [`Error::Unavailable`] per `spec.md` §4.5 rather than being silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LegacyImageFormat {
    Grayscale = 0,
    Intensity = 1,
    GrayscaleAlpha = 2,
    Rgb = 3,
    Rgba = 4,
    Indexed = 5,
    IndexedAlpha = 6,
}

impl LegacyImageFormat {
    fn from_raw(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::Grayscale,
            1 => Self::Intensity,
            2 => Self::GrayscaleAlpha,
            3 => Self::Rgb,
            4 => Self::Rgba,
            5 => Self::Indexed,
            6 => Self::IndexedAlpha,
            _ => return None,
        })
    }

    fn is_palettized(self) -> bool {
        matches!(self, Self::Indexed | Self::IndexedAlpha)
    }

    /// Bytes-per-pixel once reconstituted into truecolor (palettized formats expand to this on
    /// decode; non-palettized formats already store this many bytes per pixel).
    fn truecolor_bytes_per_pixel(self) -> usize {
        match self {
            Self::Grayscale | Self::Intensity => 1,
            Self::GrayscaleAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba | Self::Indexed | Self::IndexedAlpha => 4,
        }
    }
}

/// A decoded `VARIANT_IMAGE` (legacy) payload, converted to a modern truecolor pixel buffer where
/// possible. Palettized source data is expanded on decode so downstream consumers never need to
/// know the original format was indexed; `source_format_was_indexed` is kept only so the serializer
/// can note the fidelity loss in compat metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyImage {
    pub format: u32,
    pub mipmap_count: u32,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub source_format_was_indexed: bool,
}

pub fn decode_legacy_image(reader: &mut GodotReader<'_>) -> core::result::Result<LegacyImage, crate::variant::Error> {
    decode_legacy_image_inner(reader).map_err(|error| match error {
        Error::Stream { source } => crate::variant::Error::Stream { source },
        // The variant codec has no "unavailable" concept of its own; the resource deserializer,
        // which does distinguish it, should call `decode_legacy_image_checked` directly instead
        // of going through the generic `Variant::decode` path when it needs that distinction.
        Error::Unavailable { format } => crate::variant::Error::UnknownTag { tag: format },
    })
}

/// Like [`decode_legacy_image`], but preserves the distinction between a malformed stream and a
/// deprecated-but-well-formed format that cannot be represented.
pub fn decode_legacy_image_checked(reader: &mut GodotReader<'_>) -> Result<LegacyImage> {
    decode_legacy_image_inner(reader)
}

fn decode_legacy_image_inner(reader: &mut GodotReader<'_>) -> Result<LegacyImage> {
    let raw_format = reader.read_u32()?;
    let mipmap_count = reader.read_u32()?;
    let width = reader.read_u32()?;
    let height = reader.read_u32()?;
    let data_length = reader.read_u32()? as usize;
    let data = reader.get_slice(data_length)?.to_vec();

    let format = LegacyImageFormat::from_raw(raw_format).context(UnavailableSnafu { format: raw_format })?;

    if format.is_palettized() {
        log::debug!("expanding palettized legacy image format {raw_format:?} into truecolor");
        let expanded = expand_palettized(&data, width, height, format);
        Ok(LegacyImage {
            format: raw_format,
            mipmap_count,
            width,
            height,
            data: expanded,
            source_format_was_indexed: true,
        })
    } else {
        Ok(LegacyImage { format: raw_format, mipmap_count, width, height, data, source_format_was_indexed: false })
    }
}

fn expand_palettized(data: &[u8], width: u32, height: u32, format: LegacyImageFormat) -> Vec<u8> {
    let pixel_count = (width as usize) * (height as usize);
    let has_alpha = matches!(format, LegacyImageFormat::IndexedAlpha);
    let palette_entry_size = if has_alpha { 4 } else { 3 };
    let palette_size = 256 * palette_entry_size;

    if data.len() < palette_size + pixel_count {
        // Malformed/truncated palette data; return what indices we can as grayscale rather than
        // panicking on an out-of-bounds index.
        return data.to_vec();
    }

    let palette = &data[..palette_size];
    let indices = &data[palette_size..palette_size + pixel_count];

    let mut output = Vec::with_capacity(pixel_count * 4);
    for &index in indices {
        let entry = &palette[index as usize * palette_entry_size..(index as usize + 1) * palette_entry_size];
        output.push(entry[0]);
        output.push(entry[1]);
        output.push(entry[2]);
        output.push(if has_alpha { entry[3] } else { 255 });
    }
    output
}

pub fn encode_legacy_image(writer: &mut ByteWriter, image: &LegacyImage) {
    writer.write_u32(image.format);
    writer.write_u32(image.mipmap_count);
    writer.write_u32(image.width);
    writer.write_u32(image.height);
    writer.write_u32(image.data.len() as u32);
    writer.write_bytes(&image.data);
}

/// The engine-2 import metadata tail section (`spec.md` §4.5), present iff the resource header's
/// metadata-offset field is non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportMetadataV2 {
    pub editor: String,
    pub sources: Vec<(String, [u8; 16])>,
    pub options: Vec<(String, Variant)>,
}

pub fn decode_import_metadata_v2(
    reader: &mut GodotReader<'_>,
    schema: crate::variant::Schema,
) -> Result<ImportMetadataV2> {
    let editor = reader.read_length_prefixed_utf8()?;

    let source_count = reader.read_u32()?;
    let mut sources = Vec::with_capacity(source_count as usize);
    for _ in 0..source_count {
        let path = reader.read_length_prefixed_utf8()?;
        let mut md5 = [0u8; 16];
        md5.copy_from_slice(reader.get_slice(16)?);
        sources.push((path, md5));
    }

    let option_count = reader.read_u32()?;
    let mut options = Vec::with_capacity(option_count as usize);
    for _ in 0..option_count {
        let name = reader.read_length_prefixed_utf8()?;
        // Import metadata v2 only exists on resources predating the format version that dropped
        // the node-path property field, so its variant values always decode under that rule.
        let value = crate::variant::decode(reader, schema, 0)?;
        options.push((name, value));
    }

    Ok(ImportMetadataV2 { editor, sources, options })
}

impl From<crate::variant::Error> for Error {
    #[inline]
    fn from(error: crate::variant::Error) -> Self {
        match error {
            crate::variant::Error::Stream { source } => Self::Stream { source },
            crate::variant::Error::UnknownTag { .. } => Self::Stream { source: crate::stream::Error::InvalidUtf8 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdpack_core::prelude::Endian;

    #[test]
    fn decodes_non_palettized_image() {
        let mut writer = ByteWriter::new(Endian::Little, false);
        writer.write_u32(LegacyImageFormat::Rgba as u32);
        writer.write_u32(0);
        writer.write_u32(2);
        writer.write_u32(1);
        let pixels = [1u8, 2, 3, 4, 5, 6, 7, 8];
        writer.write_u32(pixels.len() as u32);
        writer.write_bytes(&pixels);
        let bytes = writer.into_inner();

        let mut reader = GodotReader::new(&bytes, Endian::Little, false);
        let image = decode_legacy_image_checked(&mut reader).unwrap();
        assert_eq!(image.width, 2);
        assert_eq!(image.height, 1);
        assert!(!image.source_format_was_indexed);
        assert_eq!(image.data, pixels);
    }

    #[test]
    fn unknown_format_is_unavailable() {
        let mut writer = ByteWriter::new(Endian::Little, false);
        writer.write_u32(999);
        writer.write_u32(0);
        writer.write_u32(1);
        writer.write_u32(1);
        writer.write_u32(0);
        let bytes = writer.into_inner();

        let mut reader = GodotReader::new(&bytes, Endian::Little, false);
        let error = decode_legacy_image_checked(&mut reader).unwrap_err();
        assert!(matches!(error, Error::Unavailable { format: 999 }));
    }
}
