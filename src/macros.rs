//! Macro for declaring a static runtime.
//!
//! Library code should take a [`SessionContext`](crate::SessionContext) /
//! [`Registry`](crate::Registry) pair explicitly; the macro exists for host
//! adapters that want one process-global runtime with free-function
//! ergonomics.

/// Declares a module holding a static [`SessionContext`](crate::SessionContext)
/// and [`Registry`](crate::Registry) pair, with free functions delegating to
/// them.
///
/// # Examples
///
/// ```rust
/// use session_singleton::{define_runtime, Policy, SessionSingleton};
///
/// #[derive(Default)]
/// struct InputRouter;
/// impl SessionSingleton for InputRouter {}
///
/// define_runtime!(app);
///
/// app::register::<InputRouter>(Policy::ScopedToSession);
/// app::begin_session(1);
///
/// assert!(app::registry().is_registered::<InputRouter>());
/// assert!(!app::context().is_shutting_down());
/// ```
///
/// # Multiple runtimes
///
/// Each invocation is completely isolated:
///
/// ```rust
/// use session_singleton::define_runtime;
///
/// define_runtime!(game);
/// define_runtime!(editor);
///
/// game::begin_session(1);
/// assert!(game::context().owner_thread().is_some());
/// assert!(editor::context().owner_thread().is_none());
/// ```
#[macro_export]
macro_rules! define_runtime {
    ($name:ident) => {
        pub mod $name {
            use std::sync::{Arc, LazyLock};

            // Context and registry statics (module-private).
            static CONTEXT: LazyLock<Arc<$crate::SessionContext>> =
                LazyLock::new(|| Arc::new($crate::SessionContext::default()));
            static REGISTRY: LazyLock<$crate::Registry> =
                LazyLock::new(|| $crate::Registry::new(Arc::clone(&CONTEXT)));

            /// Shared handle to this runtime's session context.
            pub fn context() -> Arc<$crate::SessionContext> {
                Arc::clone(&CONTEXT)
            }

            /// This runtime's registry.
            pub fn registry() -> &'static $crate::Registry {
                &REGISTRY
            }

            /// Bind the object host. The first binding wins.
            pub fn bind_host(host: Arc<dyn $crate::ObjectHost>) -> bool {
                REGISTRY.bind_host(host)
            }

            /// Register a singleton type under the given policy.
            pub fn register<T: $crate::SessionSingleton>(policy: $crate::Policy) {
                REGISTRY.register::<T>(policy)
            }

            /// Host signal: a session started during scheduling tick `tick`.
            pub fn begin_session(tick: u64) -> bool {
                CONTEXT.begin_session(tick)
            }

            /// Host signal: termination is in progress.
            pub fn notify_shutting_down() {
                CONTEXT.notify_shutting_down()
            }

            /// Resolve the singleton of type `T`.
            pub fn get<T: $crate::SessionSingleton>() -> Result<Arc<T>, $crate::SingletonError> {
                REGISTRY.get::<T>()
            }

            /// Resolve without creating or signalling.
            pub fn try_get<T: $crate::SessionSingleton>() -> Option<Arc<T>> {
                REGISTRY.try_get::<T>()
            }

            /// Announce a host-placed instance.
            pub fn offer<T: $crate::SessionSingleton>(
                instance: Arc<T>,
            ) -> Result<Arc<T>, $crate::SingletonError> {
                REGISTRY.offer(instance)
            }

            /// Report an instance's teardown.
            pub fn notify_destroyed(handle: &$crate::HostHandle) -> bool {
                REGISTRY.notify_destroyed(handle)
            }

            /// Route diagnostic events to `sink`.
            pub fn set_diagnostic_sink(
                sink: impl Fn(&$crate::DiagnosticEvent) + Send + Sync + 'static,
            ) {
                CONTEXT.set_diagnostic_sink(sink)
            }

            /// Stop routing diagnostic events.
            pub fn clear_diagnostic_sink() {
                CONTEXT.clear_diagnostic_sink()
            }
        }
    };
}
