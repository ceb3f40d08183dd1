//! Script-bytecode decompiler (`spec.md` §4.6): per-variant token tables, a shared decoder for
//! the `GDSC` container, an emitter that walks the decoded token stream back into source text,
//! and a version probe that picks the right variant for an unlabeled buffer.

pub mod decoder;
pub mod emitter;
pub mod probe;
pub mod token;
pub mod variant_record;

use variant_record::BytecodeVariant;

/// Decodes and emits `data` under a specific known variant, skipping detection. Most callers want
/// [`probe::detect_and_decompile`] instead.
pub fn decompile_with(data: &[u8], variant: &BytecodeVariant) -> Result<String, Error> {
    let script = decoder::decode(data, variant)?;
    Ok(emitter::emit(&script, variant)?)
}

#[derive(Debug, snafu::Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("{source}"))]
    Decode { source: decoder::Error },
    #[snafu(display("{source}"))]
    Emit { source: emitter::Error },
}

impl From<decoder::Error> for Error {
    fn from(source: decoder::Error) -> Self {
        Self::Decode { source }
    }
}

impl From<emitter::Error> for Error {
    fn from(source: emitter::Error) -> Self {
        Self::Emit { source }
    }
}

impl crate::error::HasErrorKind for Error {
    fn kind(&self) -> crate::error::ErrorKind {
        match self {
            Self::Decode { source } => crate::error::HasErrorKind::kind(source),
            Self::Emit { source } => crate::error::HasErrorKind::kind(source),
        }
    }
}
