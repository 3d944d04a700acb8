use crate::application::extractor::ErrorExtractor;
use crate::application::scope::TrackingScope;
use crate::config::RetryConfig;
use crate::domain::types::{
    Decision, ErrorDescription, RetryGuidance, ScopeContext, ScopeKey, ToolOutcome,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Counter identity: one record per (scope, tool) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey {
    scope: ScopeKey,
    tool: String,
}

/// Consecutive-failure state for one (scope, tool) pair.
///
/// Created on first failure, zeroed by the next success for the same pair,
/// dropped when the owning scope is pruned. The count keeps incrementing
/// past the budget; exhaustion is derived from it, so a pair past the
/// budget yields `GiveUp` for every further failure until a success or an
/// explicit reset.
#[derive(Debug, Default)]
struct ToolFailureRecord {
    count: u32,
    last_failure_at: Option<DateTime<Utc>>,
}

/// Decides, after every tool invocation, whether the agent should retry the
/// tool and with what feedback.
///
/// All decisions are computed synchronously; the engine performs no I/O and
/// never suspends. It is safe to share behind an `Arc` across concurrent
/// tool calls: the outer lock only guards the handle table, and each pair's
/// read-increment-compare runs under that pair's own lock.
pub struct RetryDecisionEngine {
    config: RetryConfig,
    tracking: TrackingScope,
    extractor: Option<ErrorExtractor>,
    counters: Mutex<HashMap<PairKey, Arc<Mutex<ToolFailureRecord>>>>,
}

impl RetryDecisionEngine {
    pub fn new(config: RetryConfig) -> Self {
        let tracking = TrackingScope::from_mode(config.tracking_scope).unwrap_or_else(|| {
            warn!("Custom tracking scope configured without a resolver; using per-invocation");
            TrackingScope::PerInvocation
        });
        Self {
            config,
            tracking,
            extractor: None,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the scope strategy, typically with [`TrackingScope::custom`].
    pub fn with_tracking_scope(mut self, tracking: TrackingScope) -> Self {
        self.tracking = tracking;
        self
    }

    /// Install a soft-error extractor. Without one, only thrown errors
    /// count toward the retry budget.
    pub fn with_error_extractor(mut self, extractor: ErrorExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Pure mapping from invocation context to tracking scope.
    pub fn resolve_scope_key(&self, context: &ScopeContext) -> ScopeKey {
        self.tracking.resolve(context)
    }

    /// Run the configured extractor over a structurally successful result.
    pub fn extract_error(&self, result: &serde_json::Value) -> Option<ErrorDescription> {
        self.extractor.as_ref().and_then(|extract| extract(result))
    }

    /// Record one tool outcome and decide what the caller should do next.
    pub fn on_tool_result(
        &self,
        scope_key: &ScopeKey,
        tool_name: &str,
        outcome: ToolOutcome,
    ) -> Decision {
        match outcome {
            ToolOutcome::Success(value) => match self.extract_error(&value) {
                None => {
                    self.reset(scope_key, tool_name);
                    Decision::Accept(value)
                }
                Some(error) => {
                    debug!(scope = %scope_key, tool = tool_name, %error, "Soft error flagged by extractor");
                    self.record_failure(scope_key, tool_name, error)
                }
            },
            ToolOutcome::Exception(error) => self.record_failure(scope_key, tool_name, error),
        }
    }

    /// Zero the pair's counter and clear exhaustion.
    ///
    /// Called internally on every success; also the explicit way out of the
    /// exhausted state.
    pub fn reset(&self, scope_key: &ScopeKey, tool_name: &str) {
        if let Some(handle) = self.existing_pair(scope_key, tool_name) {
            let mut record = handle.lock().expect("failure record lock");
            if record.count > 0 {
                debug!(
                    scope = %scope_key,
                    tool = tool_name,
                    previous_count = record.count,
                    "Resetting failure counter"
                );
            }
            record.count = 0;
        }
    }

    /// Drop every record owned by `scope_key`. For invocation-scoped
    /// tracking this runs at invocation end.
    pub fn prune_scope(&self, scope_key: &ScopeKey) {
        let mut counters = self.counters.lock().expect("counter table lock");
        let before = counters.len();
        counters.retain(|key, _| key.scope != *scope_key);
        let pruned = before - counters.len();
        if pruned > 0 {
            debug!(scope = %scope_key, pruned, "Pruned completed scope");
        }
    }

    /// Scope-lifecycle hook for invocation end. Only prunes when counters
    /// are invocation-scoped; global and custom scopes outlive invocations.
    pub fn prune_invocation(&self, invocation_id: &str) {
        if matches!(self.tracking, TrackingScope::PerInvocation) {
            self.prune_scope(&ScopeKey::from(invocation_id));
        }
    }

    /// Current consecutive-failure count for a pair (0 when untracked).
    pub fn failure_count(&self, scope_key: &ScopeKey, tool_name: &str) -> u32 {
        self.existing_pair(scope_key, tool_name)
            .map(|handle| handle.lock().expect("failure record lock").count)
            .unwrap_or(0)
    }

    /// Whether the pair has spent its retry budget.
    pub fn is_exhausted(&self, scope_key: &ScopeKey, tool_name: &str) -> bool {
        self.failure_count(scope_key, tool_name) > self.config.max_retries
    }

    /// Timestamp of the pair's most recent failure.
    pub fn last_failure_at(
        &self,
        scope_key: &ScopeKey,
        tool_name: &str,
    ) -> Option<DateTime<Utc>> {
        self.existing_pair(scope_key, tool_name)
            .and_then(|handle| handle.lock().expect("failure record lock").last_failure_at)
    }

    fn record_failure(
        &self,
        scope_key: &ScopeKey,
        tool_name: &str,
        error: ErrorDescription,
    ) -> Decision {
        let handle = self.pair_handle(scope_key, tool_name);
        // Read-increment-compare stays atomic under the pair lock; the
        // retry budget cannot be over-granted by concurrent callers.
        let mut record = handle.lock().expect("failure record lock");
        record.last_failure_at = Some(Utc::now());
        record.count += 1;

        if record.count <= self.config.max_retries {
            debug!(
                scope = %scope_key,
                tool = tool_name,
                attempt = record.count,
                max_retries = self.config.max_retries,
                "Granting retry"
            );
            Decision::Retry(RetryGuidance {
                tool_name: tool_name.to_string(),
                attempt: record.count,
                max_retries: self.config.max_retries,
                error,
            })
        } else {
            warn!(
                scope = %scope_key,
                tool = tool_name,
                failures = record.count,
                max_retries = self.config.max_retries,
                "Retry budget exhausted; giving up"
            );
            Decision::GiveUp {
                error,
                propagate: self.config.propagate_on_exhaustion,
            }
        }
    }

    /// Fetch or create the pair's record handle. The table lock is held
    /// only for the lookup; independent pairs never contend on it for the
    /// counter update itself.
    fn pair_handle(&self, scope_key: &ScopeKey, tool_name: &str) -> Arc<Mutex<ToolFailureRecord>> {
        let key = PairKey {
            scope: scope_key.clone(),
            tool: tool_name.to_string(),
        };
        let mut counters = self.counters.lock().expect("counter table lock");
        counters.entry(key).or_default().clone()
    }

    fn existing_pair(
        &self,
        scope_key: &ScopeKey,
        tool_name: &str,
    ) -> Option<Arc<Mutex<ToolFailureRecord>>> {
        let key = PairKey {
            scope: scope_key.clone(),
            tool: tool_name.to_string(),
        };
        let counters = self.counters.lock().expect("counter table lock");
        counters.get(&key).cloned()
    }
}
