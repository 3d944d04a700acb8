pub mod engine;
pub mod extractor;
pub mod plugin;
pub mod scope;

pub use engine::RetryDecisionEngine;
pub use extractor::{ErrorExtractor, json_status_error};
pub use plugin::{ReflectRetryPlugin, ToolPlugin};
pub use scope::{ScopeResolver, TrackingScope};
