use crate::domain::types::ErrorDescription;
use serde_json::Value;
use std::sync::Arc;

/// Hook for detecting application-level failures inside structurally
/// successful tool results.
///
/// Returning `None` means the result is genuinely successful. Without an
/// extractor, only thrown errors count toward the retry budget.
pub type ErrorExtractor = Arc<dyn Fn(&Value) -> Option<ErrorDescription> + Send + Sync>;

/// Extractor flagging results whose `status_field` equals `error_value`.
///
/// The failure message is taken from an `error_message` (or `message`)
/// field when present; the full result is carried as the error payload so
/// callers can still inspect it. The boundary between "error" and
/// "informative result" stays with the tool author: anything the status
/// field does not mark as an error is accepted as-is.
pub fn json_status_error(status_field: &str, error_value: &str) -> ErrorExtractor {
    let status_field = status_field.to_string();
    let error_value = error_value.to_string();
    Arc::new(move |result: &Value| {
        let status = result.get(&status_field)?.as_str()?;
        if status != error_value {
            return None;
        }
        let message = result
            .get("error_message")
            .or_else(|| result.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("tool reported an error status")
            .to_string();
        Some(ErrorDescription::with_payload(message, result.clone()))
    })
}
