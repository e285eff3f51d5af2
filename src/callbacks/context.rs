//! Call context handed to agent, model and tool callbacks.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::callbacks::hook_point::{HookKind, HookPoint};

/// Hook-point specific data carried with each dispatch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HookPayload {
    /// An agent run starting or finishing.
    Agent {
        agent_name: String,
        invocation_id: String,
        /// The user message that triggered the run, if any.
        user_content: Option<String>,
    },
    /// A request about to be sent to the model.
    ModelRequest { model: String, request: Value },
    /// A response returned by the model.
    ModelResponse { model: String, response: Value },
    /// A tool about to be called.
    ToolCall { tool_name: String, args: Value },
    /// A tool that returned.
    ToolResult {
        tool_name: String,
        args: Value,
        result: Value,
    },
}

impl HookPayload {
    /// Short name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            HookPayload::Agent { .. } => "agent",
            HookPayload::ModelRequest { .. } => "model_request",
            HookPayload::ModelResponse { .. } => "model_response",
            HookPayload::ToolCall { .. } => "tool_call",
            HookPayload::ToolResult { .. } => "tool_result",
        }
    }

    /// Whether this payload can be dispatched at `point`.
    pub fn matches(&self, point: HookPoint) -> bool {
        matches!(
            (self, point.kind),
            (
                HookPayload::Agent { .. },
                HookKind::BeforeAgent | HookKind::AfterAgent
            ) | (HookPayload::ModelRequest { .. }, HookKind::BeforeModel)
                | (HookPayload::ModelResponse { .. }, HookKind::AfterModel)
                | (HookPayload::ToolCall { .. }, HookKind::BeforeTool)
                | (HookPayload::ToolResult { .. }, HookKind::AfterTool)
        )
    }

    /// Every hook point this payload can be dispatched at.
    pub fn hook_points(&self) -> impl Iterator<Item = HookPoint> + '_ {
        HookPoint::ALL.into_iter().filter(|p| self.matches(*p))
    }
}

/// Session state shared by every callback in a dispatch.
///
/// Clones share the same map; a value written by one handler is visible to
/// the handlers after it and to the caller once the dispatch returns.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    inner: Arc<RwLock<Map<String, Value>>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    /// Insert a value, returning the previous one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.write().insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.read().clone()
    }

    // Poisoned locks are recovered: the map only holds plain values.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Map<String, Value>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Map<String, Value>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Everything a callback sees for one dispatch.
///
/// Passed by reference to every handler of the dispatch; handlers share the
/// payload, the session state and the cancellation signal.
#[derive(Debug, Clone)]
pub struct CallContext {
    payload: HookPayload,
    state: SessionState,
    cancel: CancellationToken,
}

impl CallContext {
    pub fn new(payload: HookPayload) -> Self {
        Self {
            payload,
            state: SessionState::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Attach existing session state.
    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }

    /// Tie this dispatch to an outer cancellation signal.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn agent(agent_name: impl Into<String>, invocation_id: impl Into<String>) -> Self {
        Self::new(HookPayload::Agent {
            agent_name: agent_name.into(),
            invocation_id: invocation_id.into(),
            user_content: None,
        })
    }

    pub fn model_request(model: impl Into<String>, request: Value) -> Self {
        Self::new(HookPayload::ModelRequest {
            model: model.into(),
            request,
        })
    }

    pub fn model_response(model: impl Into<String>, response: Value) -> Self {
        Self::new(HookPayload::ModelResponse {
            model: model.into(),
            response,
        })
    }

    pub fn tool_call(tool_name: impl Into<String>, args: Value) -> Self {
        Self::new(HookPayload::ToolCall {
            tool_name: tool_name.into(),
            args,
        })
    }

    pub fn tool_result(tool_name: impl Into<String>, args: Value, result: Value) -> Self {
        Self::new(HookPayload::ToolResult {
            tool_name: tool_name.into(),
            args,
            result,
        })
    }

    pub fn payload(&self) -> &HookPayload {
        &self.payload
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel the dispatch this context belongs to.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Meaningful-result rule for JSON results: absence and `null` both continue.
pub fn json_is_meaningful(value: &Value) -> bool {
    !value.is_null()
}
