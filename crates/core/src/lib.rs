//! Byte-stream primitives and small shared utilities used by every `gdpack-*` crate.
//!
//! By default, this crate only enables modules which do not have any crate dependencies (aside
//! from `snafu`, which is required for errors, and `hashbrown`, used by the directory tree).

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
#[allow(unused_imports)]
mod no_std {
    extern crate alloc;
    pub use alloc::boxed::Box;
    pub use alloc::format;
    pub use alloc::string::String;
}

pub mod prelude;

pub mod data;
pub mod util;
pub mod vfs;

#[cfg(feature = "std")]
pub mod identify;
