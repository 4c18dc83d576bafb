//! Shared test host and instrumented singleton types.

#![allow(dead_code)]

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use session_singleton::{
    ContextConfig, HostHandle, ObjectHost, Registry, SessionContext, SessionSingleton, Strictness,
    TypeKey,
};

/// Thin address of the object behind a handle, for identity assertions.
pub fn addr(handle: &HostHandle) -> usize {
    Arc::as_ptr(handle) as *const () as usize
}

pub fn instance_addr<T>(instance: &Arc<T>) -> usize {
    Arc::as_ptr(instance) as *const () as usize
}

/// Scripted object model: active and dormant objects the host "owns",
/// factories for auto-creation, and journals of persist/destroy calls.
#[derive(Default)]
pub struct TestHost {
    placed: Mutex<Vec<HostHandle>>,
    dormant: Mutex<Vec<HostHandle>>,
    /// Handles returned from locate for a key regardless of their actual
    /// type, to script a misbehaving host.
    rigged: Mutex<HashMap<TypeId, HostHandle>>,
    factories: Mutex<HashMap<TypeId, Box<dyn Fn() -> HostHandle + Send + Sync>>>,
    parented: Mutex<Vec<usize>>,
    pub persisted: Mutex<Vec<usize>>,
    pub destroyed: Mutex<Vec<usize>>,
}

impl TestHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn place<T: Send + Sync + 'static>(&self, instance: Arc<T>) -> HostHandle {
        let handle: HostHandle = instance;
        self.placed.lock().unwrap().push(handle.clone());
        handle
    }

    pub fn place_dormant<T: Send + Sync + 'static>(&self, instance: Arc<T>) -> HostHandle {
        let handle: HostHandle = instance;
        self.dormant.lock().unwrap().push(handle.clone());
        handle
    }

    /// Mark the object as having a parent, so persistence requires a
    /// detach.
    pub fn give_parent(&self, handle: &HostHandle) {
        self.parented.lock().unwrap().push(addr(handle));
    }

    pub fn add_factory<T: Send + Sync + 'static>(
        &self,
        factory: impl Fn() -> Arc<T> + Send + Sync + 'static,
    ) {
        self.factories.lock().unwrap().insert(
            TypeId::of::<T>(),
            Box::new(move || {
                let handle: HostHandle = factory();
                handle
            }),
        );
    }

    /// Script locate to hand out `handle` for lookups of `T`.
    pub fn rig_locate<T: 'static>(&self, handle: HostHandle) {
        self.rigged.lock().unwrap().insert(TypeId::of::<T>(), handle);
    }

    pub fn live_count(&self) -> usize {
        self.placed.lock().unwrap().len()
    }

    pub fn was_destroyed(&self, address: usize) -> bool {
        self.destroyed.lock().unwrap().contains(&address)
    }

    pub fn was_persisted(&self, address: usize) -> bool {
        self.persisted.lock().unwrap().contains(&address)
    }

    pub fn dormant_count(&self) -> usize {
        self.dormant.lock().unwrap().len()
    }

    /// The host's natural end-of-session teardown: everything not marked
    /// persistent goes away.
    pub fn sweep_session(&self) {
        let persisted = self.persisted.lock().unwrap().clone();
        self.placed
            .lock()
            .unwrap()
            .retain(|handle| persisted.contains(&addr(handle)));
    }

    /// Forget all scripted state (for tests sharing a static host).
    pub fn reset(&self) {
        self.placed.lock().unwrap().clear();
        self.dormant.lock().unwrap().clear();
        self.rigged.lock().unwrap().clear();
        self.factories.lock().unwrap().clear();
        self.parented.lock().unwrap().clear();
        self.persisted.lock().unwrap().clear();
        self.destroyed.lock().unwrap().clear();
    }
}

impl ObjectHost for TestHost {
    fn locate(&self, key: TypeKey, include_inactive: bool) -> Option<HostHandle> {
        if let Some(handle) = self.rigged.lock().unwrap().get(&key.id()) {
            return Some(handle.clone());
        }
        if let Some(handle) = self
            .placed
            .lock()
            .unwrap()
            .iter()
            .find(|handle| (***handle).type_id() == key.id())
        {
            return Some(handle.clone());
        }
        if include_inactive {
            return self
                .dormant
                .lock()
                .unwrap()
                .iter()
                .find(|handle| (***handle).type_id() == key.id())
                .cloned();
        }
        None
    }

    fn create(&self, key: TypeKey) -> HostHandle {
        let handle = {
            let factories = self.factories.lock().unwrap();
            let factory = factories
                .get(&key.id())
                .unwrap_or_else(|| panic!("no factory scripted for {key}"));
            factory()
        };
        self.placed.lock().unwrap().push(handle.clone());
        handle
    }

    fn mark_persistent(&self, handle: &HostHandle, detach_from_parent: bool) -> bool {
        self.persisted.lock().unwrap().push(addr(handle));
        if !detach_from_parent {
            return false;
        }
        let mut parented = self.parented.lock().unwrap();
        match parented.iter().position(|&a| a == addr(handle)) {
            Some(index) => {
                parented.remove(index);
                true
            }
            None => false,
        }
    }

    fn destroy(&self, handle: HostHandle) {
        let target = addr(&handle);
        self.placed.lock().unwrap().retain(|h| addr(h) != target);
        self.dormant.lock().unwrap().retain(|h| addr(h) != target);
        self.rigged.lock().unwrap().retain(|_, h| addr(h) != target);
        self.destroyed.lock().unwrap().push(target);
    }
}

/// Singleton with hook counters, registered Persistent in most tests.
#[derive(Debug, Default)]
pub struct AudioDirector {
    pub constructed: AtomicUsize,
    pub session_starts: AtomicUsize,
    pub teardowns: AtomicUsize,
}

impl SessionSingleton for AudioDirector {
    fn on_constructed(&self) {
        self.constructed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_session_start(&self) {
        self.session_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_destroyed(&self) {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Singleton with hook counters, registered ScopedToSession in most tests.
#[derive(Debug, Default)]
pub struct SaveVault {
    pub constructed: AtomicUsize,
    pub session_starts: AtomicUsize,
    pub teardowns: AtomicUsize,
}

impl SessionSingleton for SaveVault {
    fn on_constructed(&self) {
        self.constructed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_session_start(&self) {
        self.session_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_destroyed(&self) {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hook-less singleton for wrong-type and bystander roles.
#[derive(Debug, Default)]
pub struct InputRouter;

impl SessionSingleton for InputRouter {}

/// A context, a scripted host, and a registry wired together.
pub struct Rig {
    pub context: Arc<SessionContext>,
    pub host: Arc<TestHost>,
    pub registry: Registry,
}

pub fn rig(strictness: Strictness) -> Rig {
    let context = Arc::new(SessionContext::new(ContextConfig::with_strictness(
        strictness,
    )));
    let host = TestHost::new();
    let dyn_host: Arc<dyn ObjectHost> = host.clone();
    let registry = Registry::with_host(Arc::clone(&context), dyn_host);
    Rig {
        context,
        host,
        registry,
    }
}

/// Record diagnostic event codes as they are emitted.
pub fn capture_events(context: &SessionContext) -> Arc<Mutex<Vec<String>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    context.set_diagnostic_sink(move |event| {
        sink.lock().unwrap().push(event.code().to_string());
    });
    events
}

pub fn count_code(events: &Arc<Mutex<Vec<String>>>, code: &str) -> usize {
    events.lock().unwrap().iter().filter(|c| *c == code).count()
}
