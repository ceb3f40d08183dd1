//! Convenient re-exports of commonly used data types, designed to make crate usage painless.
//!
//! The contents of this module can be used by including the following in any module:
//! ```ignore
//! use gdpack_godot::prelude::*;
//! ```

#[doc(inline)]
pub use crate::error::{ErrorKind, HasErrorKind};
#[doc(inline)]
pub use crate::pack::{PackOpenOptions, PackedFile, ResourcePack};
#[doc(inline)]
pub use crate::registry::{ClassRegistry, InstantiateResult, NativeResource, NullClassRegistry, UidRegistry};
#[doc(inline)]
pub use crate::resource::{LoadMode, LoadOptions, Resource, ResourceFile};
#[doc(inline)]
pub use crate::script::probe::{detect_and_decompile, test_bytecode, BytecodeTestResult};
#[doc(inline)]
pub use crate::stream::{ByteWriter, GodotReader};
#[doc(inline)]
pub use crate::text::{emit as emit_text_resource, TextResource};
#[doc(inline)]
pub use crate::variant::{Schema, Variant};

pub mod pack {
    #[doc(inline)]
    pub use crate::pack::Error;
}

pub mod resource {
    #[doc(inline)]
    pub use crate::resource::Error;
}

pub mod script {
    #[doc(inline)]
    pub use crate::script::Error;
}

pub mod variant {
    #[doc(inline)]
    pub use crate::variant::Error;
}
