use std::fmt;

/// Reasons a lookup or establishment attempt resolved to no instance.
///
/// Callers must treat [`Registry::get`](crate::Registry::get) as fallible
/// even under a policy that nominally guarantees auto-creation: the
/// shutdown window, a call from a non-owner thread, or a blocked dormant
/// instance all resolve to an error here rather than a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingletonError {
    /// The calling thread is not the owner context.
    AffinityViolation { type_name: &'static str },
    /// The host produced an object whose concrete type is not the declared
    /// type. The offending object has been destroyed.
    TypeMismatch { expected: &'static str },
    /// A different live instance is already established for this type.
    /// The rejected candidate has been destroyed.
    DuplicateInstance { type_name: &'static str },
    /// Nothing is placed for a type whose policy does not auto-create,
    /// or a passive lookup found nothing.
    MissingRequiredPlacement { type_name: &'static str },
    /// A dormant instance exists; creating a second one alongside it would
    /// produce a hidden duplicate, so auto-creation was blocked.
    InactiveInstanceBlocksAutoCreate { type_name: &'static str },
    /// The host signalled termination; lookups no longer search or create.
    ShuttingDown,
    /// No session is running, so the requested operation has no
    /// lifecycle guarantees to attach to.
    NotInSession,
    /// No slot has been registered for this type.
    NotRegistered { type_name: &'static str },
    /// The registry has no bound object host yet.
    HostNotBound,
}

impl SingletonError {
    /// Stable error code for structured logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AffinityViolation { .. } => "singleton_affinity_violation",
            Self::TypeMismatch { .. } => "singleton_type_mismatch",
            Self::DuplicateInstance { .. } => "singleton_duplicate_instance",
            Self::MissingRequiredPlacement { .. } => "singleton_missing_required_placement",
            Self::InactiveInstanceBlocksAutoCreate { .. } => "singleton_inactive_blocks_auto_create",
            Self::ShuttingDown => "singleton_shutting_down",
            Self::NotInSession => "singleton_not_in_session",
            Self::NotRegistered { .. } => "singleton_not_registered",
            Self::HostNotBound => "singleton_host_not_bound",
        }
    }
}

impl fmt::Display for SingletonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AffinityViolation { type_name } => {
                write!(f, "lookup of {type_name} rejected: caller is not the owner thread")
            }
            Self::TypeMismatch { expected } => {
                write!(f, "host object is not of the declared type {expected}")
            }
            Self::DuplicateInstance { type_name } => {
                write!(f, "a live {type_name} instance is already established")
            }
            Self::MissingRequiredPlacement { type_name } => {
                write!(f, "no {type_name} instance is placed")
            }
            Self::InactiveInstanceBlocksAutoCreate { type_name } => {
                write!(f, "a dormant {type_name} instance blocks auto-creation")
            }
            Self::ShuttingDown => write!(f, "host is shutting down"),
            Self::NotInSession => write!(f, "no session is running"),
            Self::NotRegistered { type_name } => {
                write!(f, "no slot registered for {type_name}")
            }
            Self::HostNotBound => write!(f, "no object host bound to the registry"),
        }
    }
}

impl std::error::Error for SingletonError {}
