//! Runtime posture configuration.

/// Diagnostic posture of a [`SessionContext`](crate::SessionContext).
///
/// `Strict` is the authoring posture: misuse is reported through the
/// diagnostic sink and mirrored to the `log` facade, and the optional
/// pre-creation checks (dormant-instance probe) are performed. `Lenient`
/// is the shipping posture: every diagnostic is suppressed and the
/// pre-creation checks are skipped, trading observability for resilience.
///
/// Lookup *results* do not depend on the posture for affinity, duplicate,
/// or type-exactness failures; those always resolve to an empty result for
/// the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Report diagnostics, run pre-creation checks (development builds).
    Strict,
    /// Suppress diagnostics, fail soft (production builds).
    Lenient,
}

impl Default for Strictness {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Strictness::Strict
        } else {
            Strictness::Lenient
        }
    }
}

/// Construction options for a [`SessionContext`](crate::SessionContext).
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextConfig {
    /// Diagnostic posture. Defaults to [`Strictness::Strict`] in debug
    /// builds and [`Strictness::Lenient`] in release builds.
    pub strictness: Strictness,
}

impl ContextConfig {
    /// Config with an explicit posture, independent of the build profile.
    pub fn with_strictness(strictness: Strictness) -> Self {
        Self { strictness }
    }
}
