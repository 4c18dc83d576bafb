//! Session epoch tracking.
//!
//! The host re-enters a fresh session without necessarily destroying static
//! process state, so cached references must be revalidated against a
//! monotonically advancing epoch rather than against process lifetime. The
//! tracker also carries the session phase (idle / running / shutting down)
//! and absorbs duplicate session-begin notifications delivered within the
//! same host scheduling tick.
//!
//! Everything here is plain atomics: the shutdown flag is written from a
//! background termination signal and read everywhere, so `Release` writes
//! and `Acquire` reads are the whole synchronization story. Eventual
//! visibility is sufficient; a briefly stale read of the shutdown flag on a
//! background thread is acceptable because background threads are rejected
//! by the affinity guard before they can touch any slot.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Identifier of one host session.
///
/// Epochs wrap. Comparison is therefore by *inequality only*: "the epoch
/// changed" means any difference from the last observed value, never
/// "the epoch is greater". This type deliberately does not implement `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionEpoch(u32);

impl SessionEpoch {
    /// Epoch observed before the first session begins.
    pub const UNSTARTED: SessionEpoch = SessionEpoch(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the host currently is in its session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session is running. Lookups degrade to passive host queries with
    /// no cache mutation and no creation.
    Idle,
    /// A session is running; full lookup and establishment semantics apply.
    Running,
    /// The host signalled termination. Lookups resolve empty without
    /// searching or creating, so torn-down instances are never resurrected.
    ShuttingDown,
}

const PHASE_IDLE: u8 = 0;
const PHASE_RUNNING: u8 = 1;
const PHASE_SHUTTING_DOWN: u8 = 2;

/// Sentinel for "no session-begin notification seen yet".
const TICK_NONE: u64 = u64::MAX;

/// Process-wide session epoch, phase, and begin-notification dedup state.
pub struct EpochTracker {
    epoch: AtomicU32,
    phase: AtomicU8,
    last_begin_tick: AtomicU64,
}

impl EpochTracker {
    pub fn new() -> Self {
        Self {
            epoch: AtomicU32::new(SessionEpoch::UNSTARTED.as_u32()),
            phase: AtomicU8::new(PHASE_IDLE),
            last_begin_tick: AtomicU64::new(TICK_NONE),
        }
    }

    /// Record a host session start delivered during scheduling tick `tick`.
    ///
    /// Advances the epoch (wrapping), clears any shutting-down state, and
    /// returns `true`. Duplicate notifications within the same tick are
    /// absorbed: the second and later calls return `false` and change
    /// nothing, so the observable effect equals a single call.
    pub fn begin_session(&self, tick: u64) -> bool {
        let previous = self.last_begin_tick.swap(tick, Ordering::AcqRel);
        if previous == tick {
            return false;
        }
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.phase.store(PHASE_RUNNING, Ordering::Release);
        true
    }

    /// Record the host's termination-in-progress signal.
    ///
    /// Idempotent; callable from any thread and any phase. Cleared by the
    /// next `begin_session`. Best-effort by contract: the host's signal is
    /// not guaranteed to fire on abnormal termination.
    pub fn notify_shutting_down(&self) {
        self.phase.store(PHASE_SHUTTING_DOWN, Ordering::Release);
    }

    pub fn current_epoch(&self) -> SessionEpoch {
        SessionEpoch::from_raw(self.epoch.load(Ordering::Acquire))
    }

    pub fn phase(&self) -> SessionPhase {
        match self.phase.load(Ordering::Acquire) {
            PHASE_RUNNING => SessionPhase::Running,
            PHASE_SHUTTING_DOWN => SessionPhase::ShuttingDown,
            _ => SessionPhase::Idle,
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.phase() == SessionPhase::ShuttingDown
    }

    /// Return the tracker to its initial state.
    pub(crate) fn reset(&self) {
        self.epoch
            .store(SessionEpoch::UNSTARTED.as_u32(), Ordering::Release);
        self.phase.store(PHASE_IDLE, Ordering::Release);
        self.last_begin_tick.store(TICK_NONE, Ordering::Release);
    }

    #[cfg(test)]
    fn force_epoch(&self, epoch: SessionEpoch) {
        self.epoch.store(epoch.as_u32(), Ordering::Release);
    }
}

impl Default for EpochTracker {
    fn default() -> Self {
        Self::new()
    }
}
