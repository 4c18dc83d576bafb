//! Slot storage and the instance-establishment protocol.
//!
//! One [`Slot`] per registered type holds a non-owning reference to the
//! current instance plus the epoch at which that reference was last
//! validated. A slot moves `Empty → Cached → Empty`; any epoch change
//! forces `Empty` first, so a stale reference from a previous session can
//! never be observed as valid.
//!
//! Lock discipline: slot state is mutated under one `parking_lot::Mutex`,
//! but host primitives, lifecycle hooks, and diagnostic sinks always run
//! *outside* it. Establishment markers are committed before the hooks
//! fire, so a hook that re-enters the registry (to look up another
//! singleton, or even its own type) sees consistent state instead of
//! deadlocking.
//!
//! Only the owner thread gets past the affinity guard, so slot mutation is
//! single-threaded in practice; the mutex exists for the `Sync` contract,
//! not for contention.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

use crate::config::Strictness;
use crate::context::SessionContext;
use crate::epoch::{SessionEpoch, SessionPhase};
use crate::error::SingletonError;
use crate::event::DiagnosticEvent;
use crate::host::{concrete_type_id, HostHandle, ObjectHost, TypeKey};
use crate::policy::Policy;
use crate::singleton::{SessionSingleton, SlotHooks};

type ErasedWeak = Weak<dyn Any + Send + Sync>;

/// Per-type cache entry.
struct Slot {
    policy: Policy,
    hooks: SlotHooks,
    /// Non-owning reference to the established instance. The host's object
    /// model owns the instance; the slot only observes it.
    handle: Option<ErasedWeak>,
    /// Epoch at which `handle` was last validated.
    validated_epoch: SessionEpoch,
    /// Epoch for which the per-session hook has already fired.
    session_hook_epoch: Option<SessionEpoch>,
    /// Identity of the instance whose one-time construction hook has
    /// fired. Kept across epoch invalidation; holding the `Weak` pins the
    /// allocation, so pointer identity cannot be recycled under us.
    constructed: Option<ErasedWeak>,
}

impl Slot {
    fn new(policy: Policy, hooks: SlotHooks) -> Self {
        Self {
            policy,
            hooks,
            handle: None,
            validated_epoch: SessionEpoch::UNSTARTED,
            session_hook_epoch: None,
            constructed: None,
        }
    }

    fn live_handle(&self) -> Option<HostHandle> {
        self.handle.as_ref().and_then(Weak::upgrade)
    }
}

fn thin_addr(handle: &HostHandle) -> usize {
    Arc::as_ptr(handle) as *const () as usize
}

fn is_same_instance(weak: &ErasedWeak, handle: &HostHandle) -> bool {
    std::ptr::addr_eq(weak.as_ptr(), Arc::as_ptr(handle))
}

fn downcast<T: Any + Send + Sync>(handle: HostHandle) -> Result<Arc<T>, SingletonError> {
    handle
        .downcast::<T>()
        .map_err(|_| SingletonError::TypeMismatch {
            expected: type_name::<T>(),
        })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lookup {
    /// `get`: may create, signals missing placement.
    Establish,
    /// `try_get`: never creates, never signals.
    Peek,
}

/// Outcome of the slot-mutation phase of establishment; everything that
/// touches the host or user code happens after the lock is released.
enum Verdict {
    AlreadyCached(HostHandle),
    Duplicate {
        kept: usize,
    },
    Accepted {
        hooks: SlotHooks,
        fire_constructed: bool,
        fire_session: bool,
        persist: bool,
    },
}

/// Policy-driven singleton slots over one [`SessionContext`] and one
/// [`ObjectHost`].
///
/// Types are registered up front with their [`Policy`]; lookups go through
/// [`get`](Self::get) / [`try_get`](Self::try_get), host-placed instances
/// may announce themselves through [`offer`](Self::offer), and the host's
/// teardown reports arrive at [`notify_destroyed`](Self::notify_destroyed).
pub struct Registry {
    context: Arc<SessionContext>,
    host: OnceLock<Arc<dyn ObjectHost>>,
    slots: Mutex<HashMap<TypeId, Slot>>,
}

impl Registry {
    /// A registry with no object host bound yet. Registration works
    /// immediately; lookups return [`SingletonError::HostNotBound`] until
    /// [`bind_host`](Self::bind_host) is called.
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self {
            context,
            host: OnceLock::new(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_host(context: Arc<SessionContext>, host: Arc<dyn ObjectHost>) -> Self {
        let registry = Self::new(context);
        let _ = registry.host.set(host);
        registry
    }

    /// Bind the object host. The first binding wins; returns `false` when
    /// a host is already bound.
    pub fn bind_host(&self, host: Arc<dyn ObjectHost>) -> bool {
        self.host.set(host).is_ok()
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// Register type `T` under `policy`, creating an empty slot and its
    /// hook table. Registering the same type again replaces the slot and
    /// drops any cached state.
    pub fn register<T: SessionSingleton>(&self, policy: Policy) {
        self.slots
            .lock()
            .insert(TypeId::of::<T>(), Slot::new(policy, SlotHooks::of::<T>()));
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.slots.lock().contains_key(&TypeId::of::<T>())
    }

    /// Resolve the singleton of type `T`, establishing (and, policy
    /// permitting, creating) it if needed.
    ///
    /// Outside a running session this degrades to a passive host query;
    /// during shutdown it resolves to [`SingletonError::ShuttingDown`]
    /// without searching or creating; from a non-owner thread it resolves
    /// to [`SingletonError::AffinityViolation`] without touching any slot.
    pub fn get<T: SessionSingleton>(&self) -> Result<Arc<T>, SingletonError> {
        self.acquire::<T>(Lookup::Establish, "Registry::get")
    }

    /// Like [`get`](Self::get), but never creates and never signals a
    /// missing placement. The recommended lookup for teardown paths, which
    /// often run inside the shutdown window.
    pub fn try_get<T: SessionSingleton>(&self) -> Option<Arc<T>> {
        self.acquire::<T>(Lookup::Peek, "Registry::try_get").ok()
    }

    /// Establish a host-placed instance that announces itself.
    ///
    /// The first announced instance wins; a different live instance
    /// arriving later is rejected, destroyed through the host, and
    /// reported as a duplicate. Re-announcing the established instance is
    /// accepted idempotently. Returns the winning instance.
    pub fn offer<T: SessionSingleton>(&self, instance: Arc<T>) -> Result<Arc<T>, SingletonError> {
        let type_name = type_name::<T>();
        if self.context.phase() == SessionPhase::Idle {
            return Err(SingletonError::NotInSession);
        }
        if !self
            .context
            .affinity()
            .validate("Registry::offer", self.context.reporter())
        {
            return Err(SingletonError::AffinityViolation { type_name });
        }
        if self.context.is_shutting_down() {
            return Err(SingletonError::ShuttingDown);
        }
        let host = self.host()?;
        let epoch = self.context.current_epoch();
        // Invalidate a stale cached reference before the duplicate check,
        // or a leftover from the previous session would masquerade as the
        // established instance.
        let _ = self.slot_snapshot(TypeId::of::<T>(), type_name, epoch)?;
        let handle: HostHandle = instance;
        self.establish::<T>(&host, handle, epoch, false)
    }

    /// Teardown report from the host for `handle`.
    ///
    /// Clears the slot iff `handle` is the cached instance, then runs the
    /// destruction hook. This is the only path that clears a slot outside
    /// of epoch invalidation. Returns whether a slot was cleared.
    pub fn notify_destroyed(&self, handle: &HostHandle) -> bool {
        let type_id = concrete_type_id(handle);
        let hooks = {
            let mut slots = self.slots.lock();
            let Some(slot) = slots.get_mut(&type_id) else {
                return false;
            };
            let is_cached = slot
                .handle
                .as_ref()
                .is_some_and(|weak| is_same_instance(weak, handle));
            if !is_cached {
                return false;
            }
            slot.handle = None;
            slot.hooks
        };
        (hooks.on_destroyed)(&**handle);
        self.context
            .reporter()
            .report(&DiagnosticEvent::InstanceDestroyed {
                type_name: hooks.type_name,
            });
        true
    }

    /// Test support: drop every slot, registrations included.
    #[doc(hidden)]
    pub fn clear_slots(&self) {
        self.slots.lock().clear();
    }

    fn host(&self) -> Result<Arc<dyn ObjectHost>, SingletonError> {
        self.host.get().cloned().ok_or(SingletonError::HostNotBound)
    }

    fn acquire<T: SessionSingleton>(
        &self,
        lookup: Lookup,
        caller: &'static str,
    ) -> Result<Arc<T>, SingletonError> {
        let type_name = type_name::<T>();
        if self.context.phase() == SessionPhase::Idle {
            return self.passive_locate::<T>();
        }
        if !self
            .context
            .affinity()
            .validate(caller, self.context.reporter())
        {
            return Err(SingletonError::AffinityViolation { type_name });
        }
        if self.context.is_shutting_down() {
            return Err(SingletonError::ShuttingDown);
        }
        let host = self.host()?;
        let epoch = self.context.current_epoch();
        let key = TypeKey::of::<T>();

        let (policy, cached) = self.slot_snapshot(key.id(), type_name, epoch)?;
        if let Some(handle) = cached {
            return downcast::<T>(handle);
        }

        if let Some(candidate) = host.locate(key, false) {
            return self.establish::<T>(&host, candidate, epoch, false);
        }
        if lookup == Lookup::Peek {
            return Err(SingletonError::MissingRequiredPlacement { type_name });
        }
        if !policy.auto_creates() {
            self.context
                .reporter()
                .report(&DiagnosticEvent::MissingRequiredPlacement { type_name });
            return Err(SingletonError::MissingRequiredPlacement { type_name });
        }
        // A dormant instance means auto-creation would manufacture a
        // hidden duplicate. The lenient posture skips the probe and
        // proceeds.
        if self.context.strictness() == Strictness::Strict && host.locate(key, true).is_some() {
            self.context
                .reporter()
                .report(&DiagnosticEvent::InactiveInstanceBlocked { type_name });
            return Err(SingletonError::InactiveInstanceBlocksAutoCreate { type_name });
        }
        let created = host.create(key);
        self.establish::<T>(&host, created, epoch, true)
    }

    /// Pure locate for inspection contexts: no cache read or write, no
    /// creation, no diagnostics.
    fn passive_locate<T: SessionSingleton>(&self) -> Result<Arc<T>, SingletonError> {
        let host = self.host()?;
        match host.locate(TypeKey::of::<T>(), false) {
            Some(handle) => downcast::<T>(handle),
            None => Err(SingletonError::MissingRequiredPlacement {
                type_name: type_name::<T>(),
            }),
        }
    }

    /// Epoch-invalidate the slot if needed, then report its policy and any
    /// still-live cached handle. One lock acquisition; the invalidation
    /// diagnostic is emitted after release.
    fn slot_snapshot(
        &self,
        type_id: TypeId,
        type_name: &'static str,
        epoch: SessionEpoch,
    ) -> Result<(Policy, Option<HostHandle>), SingletonError> {
        let mut invalidated = false;
        let snapshot = {
            let mut slots = self.slots.lock();
            let slot = slots
                .get_mut(&type_id)
                .ok_or(SingletonError::NotRegistered { type_name })?;
            if slot.validated_epoch != epoch && slot.handle.is_some() {
                slot.handle = None;
                invalidated = true;
            }
            (slot.policy, slot.live_handle())
        };
        if invalidated {
            self.context
                .reporter()
                .report(&DiagnosticEvent::SlotInvalidated { type_name, epoch });
        }
        Ok(snapshot)
    }

    /// The establishment protocol for a candidate from locate, create, or
    /// [`offer`](Self::offer).
    fn establish<T: SessionSingleton>(
        &self,
        host: &Arc<dyn ObjectHost>,
        candidate: HostHandle,
        epoch: SessionEpoch,
        created: bool,
    ) -> Result<Arc<T>, SingletonError> {
        let type_name = type_name::<T>();
        let reporter = self.context.reporter();

        // Exact-type check. The registry is keyed by concrete type; an
        // abstract-layer near-miss from the host would make ownership
        // ambiguous, so it is rejected and torn down.
        let actual = concrete_type_id(&candidate);
        if actual != TypeId::of::<T>() {
            reporter.report(&DiagnosticEvent::TypeMismatch {
                expected: type_name,
                actual,
            });
            host.destroy(candidate);
            return Err(SingletonError::TypeMismatch {
                expected: type_name,
            });
        }

        let verdict = {
            let mut slots = self.slots.lock();
            let slot = slots
                .get_mut(&TypeId::of::<T>())
                .ok_or(SingletonError::NotRegistered { type_name })?;
            if let Some(existing) = slot.live_handle() {
                if thin_addr(&existing) == thin_addr(&candidate) {
                    Verdict::AlreadyCached(existing)
                } else {
                    Verdict::Duplicate {
                        kept: thin_addr(&existing),
                    }
                }
            } else {
                slot.handle = Some(Arc::downgrade(&candidate));
                slot.validated_epoch = epoch;
                let fire_constructed = !slot
                    .constructed
                    .as_ref()
                    .is_some_and(|weak| is_same_instance(weak, &candidate));
                if fire_constructed {
                    slot.constructed = Some(Arc::downgrade(&candidate));
                }
                let fire_session = slot.session_hook_epoch != Some(epoch);
                if fire_session {
                    slot.session_hook_epoch = Some(epoch);
                }
                Verdict::Accepted {
                    hooks: slot.hooks,
                    fire_constructed,
                    fire_session,
                    persist: slot.policy.persists(),
                }
            }
        };

        match verdict {
            Verdict::AlreadyCached(existing) => downcast::<T>(existing),
            Verdict::Duplicate { kept } => {
                reporter.report(&DiagnosticEvent::DuplicateInstance {
                    type_name,
                    kept,
                    rejected: thin_addr(&candidate),
                });
                host.destroy(candidate);
                Err(SingletonError::DuplicateInstance { type_name })
            }
            Verdict::Accepted {
                hooks,
                fire_constructed,
                fire_session,
                persist,
            } => {
                if persist && host.mark_persistent(&candidate, true) {
                    reporter.report(&DiagnosticEvent::ReparentedForPersistence { type_name });
                }
                if fire_constructed {
                    (hooks.on_constructed)(&*candidate);
                }
                if fire_session {
                    (hooks.on_session_start)(&*candidate);
                }
                reporter.report(&DiagnosticEvent::Established {
                    type_name,
                    epoch,
                    created,
                });
                downcast::<T>(candidate)
            }
        }
    }
}
