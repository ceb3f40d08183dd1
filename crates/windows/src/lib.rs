//! Minimal, read-only section-table access for executables that may carry an appended pack
//! payload.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod elf;
pub mod pe;
