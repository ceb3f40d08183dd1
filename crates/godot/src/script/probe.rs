//! Version probes for bytecode buffers (`spec.md` §4.6 "Version detection").
//!
//! Grounded on `bytecode_tester.cpp`'s `test_files_2_1`/`test_files_3_1`: accumulate per-variant
//! pass/fail outcomes across a handful of sample files and narrow to whichever variant never
//! failed. The reference implementation hardcodes five specific pinned commits across two
//! hand-written functions (one per ambiguous engine-minor pair); this core generalizes that into
//! one routine over whatever variant set [`variant_record::known_variants`] declares, so adding a
//! new ambiguous pair doesn't mean writing a new narrowing function.

use super::decoder;
use super::variant_record::{known_variants, BytecodeVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BytecodeTestResult {
    Pass,
    Fail,
    Corrupt,
    Unknown,
}

/// Attempts to decode `data` under `variant` without emitting source, classifying the outcome the
/// way `GDScriptDecomp::test_bytecode` does: a short buffer or bad magic is `Corrupt`; a version
/// newer than the variant supports, or any opcode/function-index the variant's tables can't
/// resolve, is `Fail`; a clean decode with at least one identifier, constant, or token is `Pass`;
/// an empty-but-structurally-valid file is `Unknown`.
#[must_use]
pub fn test_bytecode(data: &[u8], variant: &BytecodeVariant) -> BytecodeTestResult {
    let script = match decoder::decode(data, variant) {
        Ok(script) => script,
        Err(decoder::Error::ShortHeader | decoder::Error::InvalidMagic { .. }) => return BytecodeTestResult::Corrupt,
        Err(_) => return BytecodeTestResult::Fail,
    };

    for &raw in &script.tokens {
        let (local, payload) = decoder::local_opcode_and_payload(raw);
        let Some(opcode) = variant.global_token(local) else {
            return BytecodeTestResult::Fail;
        };
        if opcode == super::token::GlobalToken::BuiltInFunc && variant.function_name(payload).is_none() {
            return BytecodeTestResult::Fail;
        }
        if opcode == super::token::GlobalToken::Identifier && payload as usize >= script.identifiers.len() {
            return BytecodeTestResult::Fail;
        }
        if opcode == super::token::GlobalToken::Constant && payload as usize >= script.constants.len() {
            return BytecodeTestResult::Fail;
        }
    }

    if script.identifiers.is_empty() && script.constants.is_empty() && script.tokens.is_empty() {
        return BytecodeTestResult::Unknown;
    }
    BytecodeTestResult::Pass
}

/// Tries every known variant (newest first) and returns the first one that passes, along with its
/// decompiled source. `Corrupt`/`Fail` results are skipped silently; an all-`Fail` sweep with no
/// `Pass` returns `None` rather than guessing.
#[must_use]
pub fn detect_and_decompile(data: &[u8]) -> Option<(&'static BytecodeVariant, String)> {
    for variant in known_variants() {
        if test_bytecode(data, variant) == BytecodeTestResult::Pass {
            if let Ok(script) = decoder::decode(data, variant) {
                if let Ok(source) = super::emitter::emit(&script, variant) {
                    return Some((variant, source));
                }
            }
        }
    }
    None
}

/// Narrows an ambiguous candidate set by probing several sample files and accumulating
/// per-variant fail counts, per `spec.md` §4.6's discriminator heuristic: if only one candidate
/// never fails on any sample, that candidate is chosen.
#[must_use]
pub fn narrow_candidates(candidates: &[&'static BytecodeVariant], samples: &[&[u8]]) -> Option<&'static BytecodeVariant> {
    let mut failed = vec![false; candidates.len()];

    for sample in samples {
        for (index, variant) in candidates.iter().enumerate() {
            if failed[index] {
                continue;
            }
            if test_bytecode(sample, variant) == BytecodeTestResult::Fail {
                failed[index] = true;
            }
        }
        if failed.iter().all(|&value| value) {
            break;
        }
    }

    let survivors: Vec<_> = candidates.iter().zip(&failed).filter(|(_, failed)| !**failed).map(|(variant, _)| *variant).collect();
    match survivors.as_slice() {
        [only] => Some(only),
        // Ambiguous either way (zero or multiple survivors): the original implementation falls
        // back to the highest-numbered revision in this situation; this core leaves that
        // tie-breaking choice to the caller instead of guessing silently.
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::variant_record::BC_620EC47;
    use crate::stream::ByteWriter;
    use gdpack_core::prelude::Endian;

    #[test]
    fn short_buffer_is_corrupt() {
        assert_eq!(test_bytecode(&[0u8; 4], &BC_620EC47), BytecodeTestResult::Corrupt);
    }

    #[test]
    fn version_newer_than_variant_is_fail() {
        let mut writer = ByteWriter::new(Endian::Little, false);
        writer.write_bytes(b"GDSC");
        writer.write_u32(99);
        writer.write_u32(0);
        writer.write_u32(0);
        writer.write_u32(0);
        writer.write_u32(0);
        assert_eq!(test_bytecode(&writer.into_inner(), &BC_620EC47), BytecodeTestResult::Fail);
    }

    #[test]
    fn empty_but_valid_header_is_unknown() {
        let mut writer = ByteWriter::new(Endian::Little, false);
        writer.write_bytes(b"GDSC");
        writer.write_u32(13);
        writer.write_u32(0);
        writer.write_u32(0);
        writer.write_u32(0);
        writer.write_u32(0);
        assert_eq!(test_bytecode(&writer.into_inner(), &BC_620EC47), BytecodeTestResult::Unknown);
    }
}
