//! Per-scope failure tracking and retry decisions for agent tool calls.
//!
//! The engine sits behind the tool-execution loop of an agent framework.
//! After every tool invocation the framework reports the outcome; the
//! engine updates a consecutive-failure counter for the (scope, tool)
//! pair and answers with a [`Decision`]: accept the result, retry with
//! reflection guidance, or give up once the retry budget is spent.
//!
//! The engine itself is synchronous and performs no I/O. The async
//! [`application::plugin::ToolPlugin`] trait is the surface an embedding
//! framework registers; [`application::plugin::ReflectRetryPlugin`]
//! adapts one engine instance to that surface.

pub mod application;
pub mod config;
pub mod domain;

pub use application::engine::RetryDecisionEngine;
pub use application::extractor::{ErrorExtractor, json_status_error};
pub use application::plugin::{ReflectRetryPlugin, ToolPlugin};
pub use application::scope::{ScopeResolver, TrackingScope};
pub use config::{ConfigError, RetryConfig, ScopeMode};
pub use domain::types::{
    Decision, ErrorDescription, RetryGuidance, ScopeContext, ScopeKey, ToolOutcome,
};
