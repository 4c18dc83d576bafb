//! Diagnostic events and the reporting sink.
//!
//! Every noteworthy registry decision is described by a [`DiagnosticEvent`]
//! and handed to the [`Reporter`], which forwards it to an optional
//! user-supplied sink and mirrors it through the `log` facade. Emission is
//! gated on the context's [`Strictness`]: the lenient posture suppresses
//! all of it.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use log::Level;

use crate::affinity::ThreadToken;
use crate::config::Strictness;
use crate::epoch::SessionEpoch;

/// Events emitted by the registry and the affinity guard.
///
/// Instance identities are reported as thin pointer addresses; they are
/// meaningful only for telling two simultaneously live objects apart.
#[derive(Debug, Clone)]
pub enum DiagnosticEvent {
    /// A lifecycle-sensitive call arrived on a non-owner thread.
    AffinityViolation {
        caller_context: &'static str,
        offender: ThreadToken,
        owner: Option<ThreadToken>,
    },
    /// The host produced an object of the wrong concrete type.
    TypeMismatch {
        expected: &'static str,
        actual: TypeId,
    },
    /// A second live instance was rejected and destroyed.
    DuplicateInstance {
        type_name: &'static str,
        kept: usize,
        rejected: usize,
    },
    /// Nothing is placed for a type whose policy does not auto-create.
    MissingRequiredPlacement { type_name: &'static str },
    /// A dormant instance blocked auto-creation.
    InactiveInstanceBlocked { type_name: &'static str },
    /// An instance was detached from its parent so it could be marked
    /// persistent. Advisory only.
    ReparentedForPersistence { type_name: &'static str },
    /// A candidate was accepted into its slot.
    Established {
        type_name: &'static str,
        epoch: SessionEpoch,
        created: bool,
    },
    /// A cached reference was dropped because the epoch advanced.
    SlotInvalidated {
        type_name: &'static str,
        epoch: SessionEpoch,
    },
    /// The cached instance reported its own teardown.
    InstanceDestroyed { type_name: &'static str },
}

impl DiagnosticEvent {
    /// Stable event code for structured logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AffinityViolation { .. } => "affinity_violation",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::DuplicateInstance { .. } => "duplicate_instance",
            Self::MissingRequiredPlacement { .. } => "missing_required_placement",
            Self::InactiveInstanceBlocked { .. } => "inactive_instance_blocked",
            Self::ReparentedForPersistence { .. } => "reparented_for_persistence",
            Self::Established { .. } => "established",
            Self::SlotInvalidated { .. } => "slot_invalidated",
            Self::InstanceDestroyed { .. } => "instance_destroyed",
        }
    }

    /// Log level this event is mirrored at.
    pub fn severity(&self) -> Level {
        match self {
            Self::AffinityViolation { .. }
            | Self::TypeMismatch { .. }
            | Self::DuplicateInstance { .. }
            | Self::MissingRequiredPlacement { .. }
            | Self::InactiveInstanceBlocked { .. } => Level::Error,
            Self::ReparentedForPersistence { .. } => Level::Warn,
            Self::Established { .. }
            | Self::SlotInvalidated { .. }
            | Self::InstanceDestroyed { .. } => Level::Debug,
        }
    }
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AffinityViolation {
                caller_context,
                offender,
                owner,
            } => match owner {
                Some(owner) => write!(
                    f,
                    "affinity-violation {{ caller: {caller_context}, offender: {offender}, owner: {owner} }}"
                ),
                None => write!(
                    f,
                    "affinity-violation {{ caller: {caller_context}, offender: {offender}, owner: unknown }}"
                ),
            },
            Self::TypeMismatch { expected, actual } => {
                write!(f, "type-mismatch {{ expected: {expected}, actual: {actual:?} }}")
            }
            Self::DuplicateInstance {
                type_name,
                kept,
                rejected,
            } => write!(
                f,
                "duplicate-instance {{ type_name: {type_name}, kept: {kept:#x}, rejected: {rejected:#x} }}"
            ),
            Self::MissingRequiredPlacement { type_name } => {
                write!(f, "missing-required-placement {{ type_name: {type_name} }}")
            }
            Self::InactiveInstanceBlocked { type_name } => {
                write!(f, "inactive-instance-blocked {{ type_name: {type_name} }}")
            }
            Self::ReparentedForPersistence { type_name } => {
                write!(f, "reparented-for-persistence {{ type_name: {type_name} }}")
            }
            Self::Established {
                type_name,
                epoch,
                created,
            } => write!(
                f,
                "established {{ type_name: {type_name}, epoch: {epoch}, created: {created} }}"
            ),
            Self::SlotInvalidated { type_name, epoch } => {
                write!(f, "slot-invalidated {{ type_name: {type_name}, epoch: {epoch} }}")
            }
            Self::InstanceDestroyed { type_name } => {
                write!(f, "instance-destroyed {{ type_name: {type_name} }}")
            }
        }
    }
}

/// User-supplied diagnostic callback.
///
/// Invoked synchronously on the thread the event originated from, outside
/// any registry lock, so the sink may call back into the registry.
pub type DiagnosticSink = dyn Fn(&DiagnosticEvent) + Send + Sync;

/// Strictness-gated event emission.
pub(crate) struct Reporter {
    strictness: Strictness,
    sink: ArcSwapOption<Box<DiagnosticSink>>,
}

impl Reporter {
    pub(crate) fn new(strictness: Strictness) -> Self {
        Self {
            strictness,
            sink: ArcSwapOption::new(None),
        }
    }

    pub(crate) fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub(crate) fn set_sink(&self, sink: impl Fn(&DiagnosticEvent) + Send + Sync + 'static) {
        let boxed: Box<DiagnosticSink> = Box::new(sink);
        self.sink.store(Some(Arc::new(boxed)));
    }

    pub(crate) fn clear_sink(&self) {
        self.sink.store(None);
    }

    pub(crate) fn report(&self, event: &DiagnosticEvent) {
        if self.strictness == Strictness::Lenient {
            return;
        }
        log::log!(event.severity(), "[{}] {}", event.code(), event);
        let sink = self.sink.load();
        if let Some(callback) = sink.as_ref() {
            (**callback)(event);
        }
    }
}
