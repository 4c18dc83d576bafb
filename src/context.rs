//! The process-lifetime session context.

use crate::affinity::{ThreadAffinityGuard, ThreadToken};
use crate::config::{ContextConfig, Strictness};
use crate::epoch::{EpochTracker, SessionEpoch, SessionPhase};
use crate::event::{DiagnosticEvent, Reporter};

/// Process-wide session state: epoch tracker, owner-thread guard, and the
/// diagnostic reporter.
///
/// There is deliberately no ambient global instance in this crate. A host
/// adapter constructs one context, shares it (usually through an `Arc`)
/// with every [`Registry`](crate::Registry) it drives, and wires the
/// host's inbound signals to [`begin_session`](Self::begin_session) and
/// [`notify_shutting_down`](Self::notify_shutting_down). Tests construct a
/// fresh context each; applications that want a static one can declare it
/// with [`define_runtime!`](crate::define_runtime).
pub struct SessionContext {
    epochs: EpochTracker,
    affinity: ThreadAffinityGuard,
    reporter: Reporter,
}

impl SessionContext {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            epochs: EpochTracker::new(),
            affinity: ThreadAffinityGuard::new(),
            reporter: Reporter::new(config.strictness),
        }
    }

    /// Host signal: a session started during scheduling tick `tick`.
    ///
    /// Advances the epoch and enters the running phase; duplicate
    /// notifications within one tick are absorbed (returns `false`).
    /// Also triggers owner-thread capture if ownership is not yet
    /// established (subject to the owner probe, when one is installed).
    pub fn begin_session(&self, tick: u64) -> bool {
        let fresh = self.epochs.begin_session(tick);
        self.affinity.try_capture();
        fresh
    }

    /// Host signal: termination is in progress. Idempotent; cleared by the
    /// next `begin_session`.
    pub fn notify_shutting_down(&self) {
        self.epochs.notify_shutting_down();
    }

    pub fn current_epoch(&self) -> SessionEpoch {
        self.epochs.current_epoch()
    }

    pub fn phase(&self) -> SessionPhase {
        self.epochs.phase()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.epochs.is_shutting_down()
    }

    /// The captured owner thread, if any.
    pub fn owner_thread(&self) -> Option<ThreadToken> {
        self.affinity.owner()
    }

    /// Install the host's "this looks like the owner context" probe.
    /// First installation wins; returns `false` otherwise.
    pub fn set_owner_probe(&self, probe: impl Fn() -> bool + Send + Sync + 'static) -> bool {
        self.affinity.set_probe(probe)
    }

    pub fn strictness(&self) -> Strictness {
        self.reporter.strictness()
    }

    /// Route diagnostic events to `sink` (in addition to the `log`
    /// facade). Replaces any previous sink.
    pub fn set_diagnostic_sink(&self, sink: impl Fn(&DiagnosticEvent) + Send + Sync + 'static) {
        self.reporter.set_sink(sink);
    }

    pub fn clear_diagnostic_sink(&self) {
        self.reporter.clear_sink();
    }

    pub(crate) fn affinity(&self) -> &ThreadAffinityGuard {
        &self.affinity
    }

    pub(crate) fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Test support: return epoch, phase, and owner capture to their
    /// initial state. The diagnostic sink and owner probe stay in place.
    #[doc(hidden)]
    pub fn reset(&self) {
        self.epochs.reset();
        self.affinity.reset();
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}
