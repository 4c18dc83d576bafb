//! The consumer-facing lifecycle contract.

use std::any::{type_name, Any};

/// Lifecycle hooks for a type managed by the
/// [`Registry`](crate::Registry).
///
/// All hooks have no-op defaults and are invoked by the registry itself,
/// which performs its own bookkeeping before and after; there is no
/// inherited implementation a hook body needs to call. Hooks run on the
/// owner thread, outside the registry lock, so a hook body may look up
/// other singletons.
///
/// Interior mutability is the implementor's business: hooks take `&self`
/// because the instance is shared with the host through an `Arc`.
pub trait SessionSingleton: Any + Send + Sync {
    /// Invoked once per physical instance, the first time it is
    /// established — never again for the same object, even across
    /// sessions.
    fn on_constructed(&self) {}

    /// Invoked once per (type, session) when the instance is first
    /// established in a session. Must be idempotent by contract: a body
    /// that subscribes to host events should unsubscribe first, because
    /// the same physical instance receives this again in the next session.
    fn on_session_start(&self) {}

    /// Invoked when the host reports this instance's teardown and the
    /// registry clears its slot.
    fn on_destroyed(&self) {}
}

/// Monomorphized hook thunks for one registered type.
///
/// Built at registration, stored in the slot, and dispatched through plain
/// `fn` pointers over the type-erased handle — no allocation, no boxed
/// closures.
#[derive(Clone, Copy)]
pub(crate) struct SlotHooks {
    pub(crate) type_name: &'static str,
    pub(crate) on_constructed: fn(&(dyn Any + Send + Sync)),
    pub(crate) on_session_start: fn(&(dyn Any + Send + Sync)),
    pub(crate) on_destroyed: fn(&(dyn Any + Send + Sync)),
}

impl SlotHooks {
    pub(crate) fn of<T: SessionSingleton>() -> Self {
        Self {
            type_name: type_name::<T>(),
            on_constructed: |object| {
                if let Some(instance) = object.downcast_ref::<T>() {
                    instance.on_constructed();
                }
            },
            on_session_start: |object| {
                if let Some(instance) = object.downcast_ref::<T>() {
                    instance.on_session_start();
                }
            },
            on_destroyed: |object| {
                if let Some(instance) = object.downcast_ref::<T>() {
                    instance.on_destroyed();
                }
            },
        }
    }
}
