//! External-collaborator interfaces (`spec.md` §6): the concrete-type registry, the UID→path
//! table, and the process-wide resource cache are all modeled as traits so the resource
//! deserializer never depends on a specific concrete-type implementation.

use hashbrown::HashMap;

use crate::legacy::LegacyImage;

/// A small, closed set of built-in types the core itself needs to understand structurally (to fix
/// up a `PackedScene` bundle, or hand back decoded pixels) — everything else is an opaque
/// [`crate::resource::MissingResource`] placeholder.
#[derive(Debug, Clone)]
pub enum NativeResource {
    PackedScene(crate::resource::PackedSceneBundle),
    Image(LegacyImage),
}

/// What [`ClassRegistry::instantiate`] returns for a given class name.
pub enum InstantiateResult {
    /// The registry recognizes this class as one of the core's native types.
    Native(NativeResource),
    /// The registry has no native representation for this class; the caller should fall back to
    /// a [`crate::resource::MissingResource`] placeholder.
    Missing,
}

/// "Instantiate this class name or tell me you don't know it" (`spec.md` §6's polymorphism
/// collaborator). Implementations outside this crate can recognize arbitrarily many engine
/// classes; this crate ships only [`NullClassRegistry`], which recognizes none.
pub trait ClassRegistry {
    fn instantiate(&self, class_name: &str) -> InstantiateResult;
}

/// A registry that never recognizes a class, forcing every resource deserialized through it into
/// the fake-load missing-resource path. Useful for tests and for callers that only want the
/// property-bag view of a resource tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullClassRegistry;

impl ClassRegistry for NullClassRegistry {
    fn instantiate(&self, _class_name: &str) -> InstantiateResult {
        InstantiateResult::Missing
    }
}

/// Resolves a globally-unique 64-bit resource identifier back to the `res://` path it was minted
/// for, per `spec.md` §4.4's `UIDS` flag handling.
pub trait UidRegistry {
    fn resolve(&self, uid: u64) -> Option<String>;
}

/// In-memory default: a simple two-way table a caller populates from a project's `.godot/uid_cache`
/// equivalent. Adequate for tests and for callers that don't need persistence.
#[derive(Debug, Default)]
pub struct InMemoryUidRegistry {
    paths: HashMap<u64, String>,
}

impl InMemoryUidRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uid: u64, path: impl Into<String>) {
        self.paths.insert(uid, path.into());
    }
}

impl UidRegistry for InMemoryUidRegistry {
    fn resolve(&self, uid: u64) -> Option<String> {
        self.paths.get(&uid).cloned()
    }
}

/// Whether a cache insertion should overwrite an existing entry for the same path or keep the one
/// already there, chosen per load per `spec.md` §5 ("insertions use a `replace` vs `reuse` flag
/// chosen per load").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Replace,
    Reuse,
}

/// The process-wide real-load resource cache (`spec.md` §5). Lookups are logically atomic;
/// real-mode loads consult this before reading a path from a pack so that the same resource isn't
/// deserialized twice within one load graph.
pub trait GlobalResourceCache {
    fn get(&self, path: &str) -> Option<NativeResource>;
    fn insert(&self, path: &str, resource: NativeResource, policy: CachePolicy);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_registry_never_recognizes_a_class() {
        let registry = NullClassRegistry;
        assert!(matches!(registry.instantiate("PackedScene"), InstantiateResult::Missing));
    }

    #[test]
    fn uid_registry_round_trips_insertions() {
        let mut registry = InMemoryUidRegistry::new();
        registry.insert(42, "res://scenes/main.tscn");
        assert_eq!(registry.resolve(42).as_deref(), Some("res://scenes/main.tscn"));
        assert_eq!(registry.resolve(7), None);
    }
}
