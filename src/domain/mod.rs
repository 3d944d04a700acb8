pub mod types;

pub use types::{Decision, ErrorDescription, RetryGuidance, ScopeContext, ScopeKey, ToolOutcome};
