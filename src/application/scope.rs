use crate::config::ScopeMode;
use crate::domain::types::{ScopeContext, ScopeKey};
use std::fmt;
use std::sync::Arc;

/// Key used when every invocation shares one counter table.
const GLOBAL_SCOPE_KEY: &str = "global";

/// Caller-supplied mapping from invocation context to tracking scope.
pub type ScopeResolver = Arc<dyn Fn(&ScopeContext) -> ScopeKey + Send + Sync>;

/// Scope-resolution strategy for one engine instance.
#[derive(Clone)]
pub enum TrackingScope {
    /// Counters live and die with a single invocation.
    PerInvocation,
    /// One shared scope across all invocations and sessions.
    Global,
    /// Caller-defined granularity (per user, per session, ...).
    Custom(ScopeResolver),
}

impl TrackingScope {
    pub fn custom<F>(resolver: F) -> Self
    where
        F: Fn(&ScopeContext) -> ScopeKey + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(resolver))
    }

    /// Pure mapping from context to scope key.
    pub fn resolve(&self, context: &ScopeContext) -> ScopeKey {
        match self {
            Self::PerInvocation => ScopeKey::new(context.invocation_id.clone()),
            Self::Global => ScopeKey::new(GLOBAL_SCOPE_KEY),
            Self::Custom(resolver) => resolver(context),
        }
    }

    /// Strategy for a config-declared mode. `Custom` requires a resolver
    /// supplied at engine construction and has no file-level equivalent.
    pub fn from_mode(mode: ScopeMode) -> Option<Self> {
        match mode {
            ScopeMode::PerInvocation => Some(Self::PerInvocation),
            ScopeMode::Global => Some(Self::Global),
            ScopeMode::Custom => None,
        }
    }
}

impl fmt::Debug for TrackingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerInvocation => f.write_str("PerInvocation"),
            Self::Global => f.write_str("Global"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
