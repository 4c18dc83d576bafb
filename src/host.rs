//! The host object-model boundary.
//!
//! The registry never owns instances; the host application's object model
//! does. Everything the registry needs from that model is expressed as four
//! primitives over type-erased handles, so the core stays independent of
//! any particular host.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Type-erased, shared handle to a host-owned object.
pub type HostHandle = Arc<dyn Any + Send + Sync>;

/// Registry key for one singleton type: the `TypeId` plus a display name
/// for diagnostics. Equality and hashing consider the id only.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Concrete type of the object behind a handle.
pub(crate) fn concrete_type_id(handle: &HostHandle) -> TypeId {
    (**handle).type_id()
}

/// The four object-model primitives the registry consumes.
///
/// Implementations are expected to be cheap and synchronous; the registry
/// calls them from the owner thread only (passive idle-phase queries may
/// come from any thread, but they are pure reads).
pub trait ObjectHost: Send + Sync {
    /// Return a live object of the exact type behind `key` if one is
    /// registered with the host; with `include_inactive`, dormant or
    /// disabled objects qualify too. No ordering guarantee across repeated
    /// calls when several objects qualify.
    fn locate(&self, key: TypeKey, include_inactive: bool) -> Option<HostHandle>;

    /// Synthesize a new object of the type behind `key`, owned by the
    /// host. Never fails by contract; resource exhaustion is out of scope.
    fn create(&self, key: TypeKey) -> HostHandle;

    /// Exempt the object from the host's next natural scope teardown.
    /// With `detach_from_parent`, detach it from any parent first (hosts
    /// whose persistence starts at root-level objects need this). Returns
    /// `true` if a detach actually occurred.
    fn mark_persistent(&self, handle: &HostHandle, detach_from_parent: bool) -> bool;

    /// Tear the object down immediately. Used to eliminate rejected
    /// duplicates and type mismatches.
    fn destroy(&self, handle: HostHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;

    #[test]
    fn keys_compare_by_type_identity() {
        assert_eq!(TypeKey::of::<Alpha>(), TypeKey::of::<Alpha>());
        assert_ne!(TypeKey::of::<Alpha>(), TypeKey::of::<Beta>());
        assert_eq!(TypeKey::of::<Alpha>().id(), TypeId::of::<Alpha>());
    }

    #[test]
    fn key_displays_the_type_name() {
        let rendered = TypeKey::of::<Alpha>().to_string();
        assert!(rendered.ends_with("Alpha"));
    }

    #[test]
    fn handles_expose_their_concrete_type() {
        let handle: HostHandle = Arc::new(Alpha);
        assert_eq!(concrete_type_id(&handle), TypeId::of::<Alpha>());
        assert_ne!(concrete_type_id(&handle), TypeId::of::<Beta>());
    }
}
