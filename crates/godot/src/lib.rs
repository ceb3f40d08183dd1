//! Pack container reader, binary resource codec, and GDScript bytecode decompiler for the Godot
//! game engine.

pub mod android_manifest;
pub mod compress;
pub mod crypto;
pub mod error;
pub mod legacy;
pub mod pack;
pub mod prelude;
pub mod registry;
pub mod resource;
pub mod script;
pub mod stream;
pub mod text;
pub mod variant;

#[cfg(test)]
use env_logger as _;
