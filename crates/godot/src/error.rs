//! The error-kind taxonomy shared across every module in this crate.
//!
//! Each module still defines its own `snafu`-derived `Error` enum (matching the convention this
//! crate is adapted from), but every variant maps to one of these kinds so callers crossing module
//! boundaries can match on `kind()` instead of downcasting a specific module's `Error` type.

/// Coarse classification of what went wrong, independent of which module raised the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested path does not exist.
    FileNotFound,
    /// The file's magic did not match anything this crate understands.
    FileUnrecognized,
    /// The file matched a recognized format but its contents are inconsistent (short read, bad
    /// tag, out-of-bounds index).
    FileCorrupt,
    /// The file is a recognized format, but a newer version than this crate supports.
    FileUnsupported,
    /// Decryption failed; surfaced distinctly so a caller can prompt for a different key.
    EncryptionError,
    /// An external reference could not be resolved.
    MissingDependency,
    /// The data names a deprecated representation with no modern equivalent.
    Unavailable,
    /// An internal invariant was violated.
    Bug,
}

/// Implemented by every module's `Error` enum so `ErrorKind` can be recovered generically.
pub trait HasErrorKind {
    fn kind(&self) -> ErrorKind;
}
