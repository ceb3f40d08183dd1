//! Decodes the `GDSC` bytecode container into its four tables (`spec.md` §4.6): identifiers,
//! constants, line map, and tokens. Grounded on `bytecode_620ec47.cpp`'s `decompile_buffer`, split
//! from that function's body into a standalone decode step so the emitter (`super::emitter`) can
//! stay variant-agnostic.

use hashbrown::HashMap;
use snafu::prelude::*;

use super::token::{decode_raw_tokens, local_opcode, payload as token_payload};
use super::variant_record::BytecodeVariant;
use crate::stream::GodotReader;
use crate::variant::{self, Schema, Variant};
use gdpack_core::prelude::{DataCursorTrait, Endian, EndianRead};

const MAGIC: &[u8; 4] = b"GDSC";
const HEADER_LEN: usize = 24;
const IDENTIFIER_XOR: u8 = 0xB6;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Buffer is shorter than the 24-byte bytecode header"))]
    ShortHeader,
    #[snafu(display("Bytecode magic {magic:?} is not GDSC"))]
    InvalidMagic { magic: [u8; 4] },
    #[snafu(display("Bytecode version {found} is newer than the {supported} this variant decodes"))]
    VersionTooNew { found: u32, supported: u32 },
    #[snafu(display("{source}"))]
    Stream { source: crate::stream::Error },
    #[snafu(display("{source}"))]
    Variant { source: variant::Error },
    #[snafu(display("{source}"))]
    Data { source: gdpack_core::data::Error },
    #[snafu(display("Identifier string is not valid UTF-8 after XOR-decoding"))]
    InvalidIdentifier,
    #[snafu(display("Token stream truncated or malformed"))]
    TruncatedTokens,
}

impl From<crate::stream::Error> for Error {
    fn from(source: crate::stream::Error) -> Self {
        Self::Stream { source }
    }
}

impl From<variant::Error> for Error {
    fn from(source: variant::Error) -> Self {
        Self::Variant { source }
    }
}

impl From<gdpack_core::data::Error> for Error {
    fn from(source: gdpack_core::data::Error) -> Self {
        Self::Data { source }
    }
}

impl crate::error::HasErrorKind for Error {
    fn kind(&self) -> crate::error::ErrorKind {
        match self {
            Self::ShortHeader | Self::InvalidMagic { .. } | Self::TruncatedTokens | Self::InvalidIdentifier => {
                crate::error::ErrorKind::FileCorrupt
            }
            Self::VersionTooNew { .. } => crate::error::ErrorKind::FileUnsupported,
            Self::Stream { .. } | Self::Variant { .. } | Self::Data { .. } => crate::error::ErrorKind::FileCorrupt,
        }
    }
}

type Result<T> = core::result::Result<T, Error>;

/// A fully decoded bytecode file, still in variant-local-opcode form.
#[derive(Debug)]
pub struct Script {
    pub version: u32,
    pub identifiers: Vec<String>,
    pub constants: Vec<Variant>,
    /// Token index → packed (line, column), as stored; the emitter only consumes line numbers
    /// indirectly through `Newline` token payloads, but callers doing source-mapped diagnostics
    /// want this table intact.
    pub lines: HashMap<u32, u32>,
    pub tokens: Vec<u32>,
}

/// Decodes `data` under `variant`'s constant-decoding schema. Does not reject a version mismatch
/// that is merely older than `variant.bytecode_version` — the original tokenizer's historical
/// versions remained loadable by newer ones; only a version newer than this variant supports is
/// an error (`bytecode_620ec47.cpp`'s `ERR_FAIL_COND_V(version > bytecode_version, ...)`).
pub fn decode(data: &[u8], variant: &BytecodeVariant) -> Result<Script> {
    ensure!(data.len() >= HEADER_LEN, ShortHeaderSnafu);
    let mut reader = GodotReader::new(data, Endian::Little, false);
    if !reader.peek_magic(MAGIC) {
        let magic: [u8; 4] = data[0..4].try_into().unwrap();
        return InvalidMagicSnafu { magic }.fail();
    }
    reader.set_position(4);
    let version = reader.read_u32()?;
    ensure!(version <= variant.bytecode_version, VersionTooNewSnafu { found: version, supported: variant.bytecode_version });
    let identifier_count = reader.read_u32()?;
    let constant_count = reader.read_u32()?;
    let line_count = reader.read_u32()?;
    let token_count = reader.read_u32()?;

    let mut identifiers = Vec::with_capacity(identifier_count as usize);
    for _ in 0..identifier_count {
        identifiers.push(read_xor_string(&mut reader)?);
    }

    let schema = if variant.variant_major <= 1 { Schema::A } else { Schema::B };
    let mut constants = Vec::with_capacity(constant_count as usize);
    for _ in 0..constant_count {
        constants.push(variant::decode(&mut reader, schema, variant::CURRENT_FORMAT_VERSION)?);
    }

    let mut lines = HashMap::with_capacity(line_count as usize);
    for _ in 0..line_count {
        let token_index = reader.read_u32()?;
        let line_col = reader.read_u32()?;
        lines.insert(token_index, line_col);
    }

    let remaining = reader.remaining_slice();
    let tokens = decode_raw_tokens(remaining, token_count).context(TruncatedTokensSnafu)?;

    Ok(Script { version, identifiers, constants, lines, tokens })
}

fn read_xor_string(reader: &mut GodotReader<'_>) -> Result<String> {
    let length = reader.read_u32()? as usize;
    let bytes = reader.get_slice(length)?;
    let mut decoded: Vec<u8> = bytes.iter().map(|byte| byte ^ IDENTIFIER_XOR).collect();
    if decoded.last() == Some(&0) {
        decoded.pop();
    }
    String::from_utf8(decoded).map_err(|_| Error::InvalidIdentifier)
}

pub(super) fn local_opcode_and_payload(raw: u32) -> (u32, u32) {
    (local_opcode(raw), token_payload(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::variant_record::BC_620EC47;
    use crate::stream::ByteWriter;

    fn build_minimal_script() -> Vec<u8> {
        let mut writer = ByteWriter::new(Endian::Little, false);
        writer.write_bytes(MAGIC);
        writer.write_u32(13); // version
        writer.write_u32(1); // identifier_count
        writer.write_u32(0); // constant_count
        writer.write_u32(0); // line_count
        writer.write_u32(1); // token_count

        let identifier = "speed";
        writer.write_u32(identifier.len() as u32 + 1);
        for byte in identifier.as_bytes() {
            writer.write_u8(byte ^ IDENTIFIER_XOR);
        }
        writer.write_u8(0 ^ IDENTIFIER_XOR);

        // one token: opcode 1 (TK_IDENTIFIER), payload 0.
        writer.write_u8(1);

        writer.into_inner()
    }

    #[test]
    fn decodes_header_and_identifier_table() {
        let bytes = build_minimal_script();
        let script = decode(&bytes, &BC_620EC47).unwrap();
        assert_eq!(script.version, 13);
        assert_eq!(script.identifiers, vec!["speed".to_owned()]);
        assert_eq!(script.tokens, vec![1]);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut bytes = build_minimal_script();
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes, &BC_620EC47), Err(Error::InvalidMagic { .. })));
    }

    #[test]
    fn rejects_version_newer_than_variant_supports() {
        let mut bytes = build_minimal_script();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(decode(&bytes, &BC_620EC47), Err(Error::VersionTooNew { .. })));
    }
}
