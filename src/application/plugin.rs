use crate::application::engine::RetryDecisionEngine;
use crate::domain::types::{Decision, ErrorDescription, ScopeContext, ToolOutcome};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Callback surface an agent-execution framework drives around each tool
/// call.
///
/// `before_tool` may short-circuit the call by returning a replacement
/// result; the default is a pass-through. `after_tool` and `on_tool_error`
/// turn the observed outcome into a [`Decision`] the framework acts on.
#[async_trait]
pub trait ToolPlugin: Send + Sync {
    async fn before_tool(
        &self,
        _context: &ScopeContext,
        _tool_name: &str,
        _args: &Value,
    ) -> Option<Value> {
        None
    }

    async fn after_tool(
        &self,
        context: &ScopeContext,
        tool_name: &str,
        result: Value,
    ) -> Decision;

    async fn on_tool_error(
        &self,
        context: &ScopeContext,
        tool_name: &str,
        error: ErrorDescription,
    ) -> Decision;

    /// Invocation-lifecycle hook; runs once the invocation is complete.
    async fn after_invocation(&self, _invocation_id: &str) {}
}

/// Adapter registering one [`RetryDecisionEngine`] as a tool plugin.
///
/// The engine stays synchronous; this layer only resolves the scope key
/// from the invocation context and forwards outcomes.
pub struct ReflectRetryPlugin {
    engine: Arc<RetryDecisionEngine>,
}

impl ReflectRetryPlugin {
    pub fn new(engine: RetryDecisionEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn engine(&self) -> &RetryDecisionEngine {
        &self.engine
    }
}

#[async_trait]
impl ToolPlugin for ReflectRetryPlugin {
    async fn after_tool(
        &self,
        context: &ScopeContext,
        tool_name: &str,
        result: Value,
    ) -> Decision {
        let scope_key = self.engine.resolve_scope_key(context);
        self.engine
            .on_tool_result(&scope_key, tool_name, ToolOutcome::Success(result))
    }

    async fn on_tool_error(
        &self,
        context: &ScopeContext,
        tool_name: &str,
        error: ErrorDescription,
    ) -> Decision {
        let scope_key = self.engine.resolve_scope_key(context);
        self.engine
            .on_tool_result(&scope_key, tool_name, ToolOutcome::Exception(error))
    }

    async fn after_invocation(&self, invocation_id: &str) {
        info!(invocation_id, "Invocation complete; pruning scoped counters");
        self.engine.prune_invocation(invocation_id);
    }
}
