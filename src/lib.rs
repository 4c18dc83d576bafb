//! # Session Singleton
//!
//! An epoch-validated singleton registry for host runtimes that restart
//! "sessions" without tearing down static process state. The host owns the
//! objects; this crate keeps a per-type identity cache *correct* across
//! session boundaries and across threads, without requiring the host to
//! reinitialize anything cooperatively.
//!
//! ## How it works
//!
//! - A [`SessionContext`] tracks the session epoch, the shutdown window,
//!   and the owner thread. The host wires its session-start and
//!   termination signals to [`SessionContext::begin_session`] and
//!   [`SessionContext::notify_shutting_down`].
//! - A [`Registry`] holds one slot per registered type. Each lookup
//!   revalidates the slot against the current epoch, so a reference cached
//!   in a previous session is dropped before it can be observed.
//! - The host's object model is abstracted as four primitives behind
//!   [`ObjectHost`]; instances implement [`SessionSingleton`] to receive
//!   construction, per-session, and teardown hooks.
//! - A [`Policy`] bound at registration decides whether an instance
//!   survives scope teardown and whether it may be synthesized on demand.
//!
//! ## Quick start
//!
//! ```rust
//! use session_singleton::{
//!     define_runtime, HostHandle, ObjectHost, Policy, SessionSingleton, TypeKey,
//! };
//! use std::any::Any;
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct AudioDirector;
//! impl SessionSingleton for AudioDirector {}
//!
//! // A minimal host: a flat pool of objects it owns.
//! #[derive(Default)]
//! struct PoolHost {
//!     pool: Mutex<Vec<HostHandle>>,
//! }
//!
//! impl ObjectHost for PoolHost {
//!     fn locate(&self, key: TypeKey, _include_inactive: bool) -> Option<HostHandle> {
//!         self.pool
//!             .lock()
//!             .unwrap()
//!             .iter()
//!             .find(|h| (***h).type_id() == key.id())
//!             .cloned()
//!     }
//!
//!     fn create(&self, _key: TypeKey) -> HostHandle {
//!         let handle: HostHandle = Arc::new(AudioDirector::default());
//!         self.pool.lock().unwrap().push(handle.clone());
//!         handle
//!     }
//!
//!     fn mark_persistent(&self, _handle: &HostHandle, _detach_from_parent: bool) -> bool {
//!         false
//!     }
//!
//!     fn destroy(&self, handle: HostHandle) {
//!         let target = Arc::as_ptr(&handle) as *const ();
//!         self.pool
//!             .lock()
//!             .unwrap()
//!             .retain(|h| Arc::as_ptr(h) as *const () != target);
//!     }
//! }
//!
//! define_runtime!(app);
//!
//! app::bind_host(Arc::new(PoolHost::default()));
//! app::register::<AudioDirector>(Policy::Persistent);
//! app::begin_session(1);
//!
//! let first = app::get::<AudioDirector>().unwrap();
//! let again = app::get::<AudioDirector>().unwrap();
//! assert!(Arc::ptr_eq(&first, &again));
//! ```
//!
//! ## Guarantees
//!
//! - At most one live, validated instance per type, as observed from the
//!   owner thread.
//! - The per-session hook fires exactly once per (type, session); the
//!   construction hook exactly once per physical instance.
//! - Calls from non-owner threads resolve empty deterministically and
//!   never mutate slot state.
//! - During the shutdown window every lookup resolves empty, so torn-down
//!   instances are never resurrected.

mod affinity;
mod config;
mod context;
mod epoch;
mod error;
mod event;
mod host;
mod macros;
mod policy;
mod registry;
mod singleton;

pub use affinity::{ThreadAffinityGuard, ThreadToken};
pub use config::{ContextConfig, Strictness};
pub use context::SessionContext;
pub use epoch::{EpochTracker, SessionEpoch, SessionPhase};
pub use error::SingletonError;
pub use event::{DiagnosticEvent, DiagnosticSink};
pub use host::{HostHandle, ObjectHost, TypeKey};
pub use policy::Policy;
pub use registry::Registry;
pub use singleton::SessionSingleton;
