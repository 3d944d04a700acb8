use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Opaque key naming the scope in which consecutive failures are counted.
///
/// Produced by a scope resolver; the engine never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey(String);

impl ScopeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ScopeKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Context snapshot handed to the scope resolver for one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeContext {
    pub invocation_id: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub agent: Option<String>,
}

impl ScopeContext {
    pub fn new(invocation_id: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            session_id: None,
            user_id: None,
            agent: None,
        }
    }

    /// Fresh context with a generated invocation id.
    pub fn new_invocation() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }
}

/// Failure description attached to retry guidance and terminal decisions.
///
/// `payload` holds the original result value when a soft error was flagged
/// inside a structurally successful result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDescription {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ErrorDescription {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(message: impl Into<String>, payload: Value) -> Self {
        Self {
            message: message.into(),
            payload: Some(payload),
        }
    }
}

impl fmt::Display for ErrorDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of one tool invocation as reported by the calling framework.
///
/// Soft errors are not a variant here: the engine discovers them by running
/// the configured extractor over `Success` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(Value),
    Exception(ErrorDescription),
}

impl ToolOutcome {
    pub fn success(value: Value) -> Self {
        Self::Success(value)
    }

    pub fn exception(message: impl Into<String>) -> Self {
        Self::Exception(ErrorDescription::new(message))
    }
}

/// Structured reflection message injected before a retry attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryGuidance {
    pub tool_name: String,
    pub attempt: u32,
    pub max_retries: u32,
    pub error: ErrorDescription,
}

impl RetryGuidance {
    /// Instruction text handed back to the model alongside the failure.
    pub fn render(&self) -> String {
        format!(
            "Tool '{tool}' failed (attempt {attempt} of {max}): {error}. \
             Reflect on the error above, correct the arguments, and call \
             '{tool}' again.",
            tool = self.tool_name,
            attempt = self.attempt,
            max = self.max_retries,
            error = self.error.message,
        )
    }
}

/// Verdict for one reported tool outcome.
///
/// The engine never raises; every path through the decision logic ends in
/// one of these variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Result is good; hand it back to the model unchanged.
    Accept(Value),
    /// Failure within budget; inject the guidance and re-invoke the tool.
    Retry(RetryGuidance),
    /// Budget spent. `propagate` tells the caller whether to escalate as a
    /// hard error or surface the failure to the model as an error payload.
    GiveUp {
        error: ErrorDescription,
        propagate: bool,
    },
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept(_))
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }

    pub fn is_give_up(&self) -> bool {
        matches!(self, Self::GiveUp { .. })
    }
}
