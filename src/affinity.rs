//! Owner-thread capture and validation.
//!
//! All lifecycle-sensitive work is confined to a single "owner" execution
//! context fixed by the host for the process lifetime. Initialization order
//! between this guard and the host's own startup is not guaranteed, so
//! ownership is captured in two tiers: eagerly when the host's session
//! start notification arrives, and lazily on the first validated call from
//! a thread the host's owner probe vouches for. When neither tier has run,
//! validation fails closed.
//!
//! Thread identity is a process-unique token minted from a global counter
//! the first time a thread asks for one. That keeps the owner cell a plain
//! `AtomicU64` — written once, read everywhere without locks, and
//! resettable by the test-support reset, none of which
//! `std::thread::ThreadId` in a `OnceLock` would allow.

use std::cell::Cell;
use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use crate::event::{DiagnosticEvent, Reporter};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static SELF_TOKEN: Cell<u64> = const { Cell::new(0) };
}

/// Process-unique identifier of one thread, compared by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadToken(NonZeroU64);

impl ThreadToken {
    /// Token of the calling thread, minted on first use.
    pub fn current() -> Self {
        let raw = SELF_TOKEN.with(|cell| {
            let existing = cell.get();
            if existing != 0 {
                existing
            } else {
                let minted = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
                cell.set(minted);
                minted
            }
        });
        // The counter starts at 1 and only grows.
        ThreadToken(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(ThreadToken)
    }

    fn as_u64(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ThreadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread-{}", self.0)
    }
}

/// Host-supplied predicate answering "does the calling thread look like the
/// owner context?". Consulted before promoting a thread to owner, so a
/// background thread is never captured by accident.
pub(crate) type OwnerProbe = Box<dyn Fn() -> bool + Send + Sync>;

/// Captures the owner thread and validates lifecycle-sensitive calls.
pub struct ThreadAffinityGuard {
    owner: AtomicU64,
    probe: OnceLock<OwnerProbe>,
}

impl ThreadAffinityGuard {
    pub fn new() -> Self {
        Self {
            owner: AtomicU64::new(0),
            probe: OnceLock::new(),
        }
    }

    /// The captured owner token, if ownership has been established.
    pub fn owner(&self) -> Option<ThreadToken> {
        ThreadToken::from_raw(self.owner.load(Ordering::Acquire))
    }

    /// Install the host's owner probe. Returns `false` if one is already
    /// installed (the first probe wins).
    pub fn set_probe(&self, probe: impl Fn() -> bool + Send + Sync + 'static) -> bool {
        self.probe.set(Box::new(probe)).is_ok()
    }

    /// Try to capture the calling thread as owner.
    ///
    /// With a probe installed, capture only happens if the probe approves
    /// the calling thread; without one, the caller is trusted (the session
    /// start notification is documented to arrive on the owner context).
    /// Returns `true` if the calling thread is the owner afterwards,
    /// whether captured now or previously.
    pub fn try_capture(&self) -> bool {
        let me = ThreadToken::current();
        if let Some(probe) = self.probe.get() {
            if !probe() {
                return self.owner() == Some(me);
            }
        }
        match self.owner.compare_exchange(
            0,
            me.as_u64(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => true,
            Err(current) => current == me.as_u64(),
        }
    }

    /// Check that the calling thread is the owner context.
    ///
    /// If ownership is not yet captured, a one-shot lazy capture is
    /// attempted through [`try_capture`](Self::try_capture). A failed
    /// validation reports exactly one [`DiagnosticEvent::AffinityViolation`]
    /// tagged with `caller_context`, the offending token, and the owner
    /// token when known.
    pub fn validate(&self, caller_context: &'static str, reporter: &Reporter) -> bool {
        let me = ThreadToken::current();
        let owner = match self.owner() {
            Some(owner) => owner,
            None => {
                if self.try_capture() {
                    return true;
                }
                reporter.report(&DiagnosticEvent::AffinityViolation {
                    caller_context,
                    offender: me,
                    owner: self.owner(),
                });
                return false;
            }
        };
        if owner == me {
            return true;
        }
        reporter.report(&DiagnosticEvent::AffinityViolation {
            caller_context,
            offender: me,
            owner: Some(owner),
        });
        false
    }

    /// Forget the captured owner. The probe stays installed.
    pub(crate) fn reset(&self) {
        self.owner.store(0, Ordering::Release);
    }
}

impl Default for ThreadAffinityGuard {
    fn default() -> Self {
        Self::new()
    }
}
