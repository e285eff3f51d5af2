//! Bundled plugins.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::callbacks::context::{CallContext, HookPayload};
use crate::callbacks::handler::{EntityRef, HandlerResult, PluginCallback};
use crate::callbacks::hook_point::HookPoint;
use crate::callbacks::plugin::PluginRegistry;
use crate::error::DispatchError;

/// Structured audit logging plugin.
///
/// Emits a `tracing::info!` event for every dispatch it sees and never
/// answers, so entity callbacks always run after it.
pub struct AuditLogPlugin;

impl AuditLogPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AuditLogPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginCallback<CallContext, Value> for AuditLogPlugin {
    fn name(&self) -> &str {
        "builtin:audit_log"
    }

    async fn call(&self, entity: &EntityRef, ctx: &CallContext) -> HandlerResult<Value> {
        match ctx.payload() {
            HookPayload::Agent {
                agent_name,
                invocation_id,
                ..
            } => {
                tracing::info!(
                    hook = "audit",
                    entity = %entity,
                    agent = %agent_name,
                    invocation_id = %invocation_id,
                    "Audit: agent run"
                );
            }
            HookPayload::ModelRequest { model, .. } => {
                tracing::info!(
                    hook = "audit",
                    entity = %entity,
                    model = %model,
                    "Audit: model request"
                );
            }
            HookPayload::ModelResponse { model, .. } => {
                tracing::info!(
                    hook = "audit",
                    entity = %entity,
                    model = %model,
                    "Audit: model response"
                );
            }
            HookPayload::ToolCall { tool_name, .. } => {
                tracing::info!(
                    hook = "audit",
                    entity = %entity,
                    tool = %tool_name,
                    "Audit: tool call"
                );
            }
            HookPayload::ToolResult { tool_name, .. } => {
                tracing::info!(
                    hook = "audit",
                    entity = %entity,
                    tool = %tool_name,
                    "Audit: tool result"
                );
            }
        }

        Ok(None)
    }
}

impl PluginRegistry {
    /// Register the bundled audit plugin at every hook point.
    ///
    /// Fails without registering anything if any hook point already has a
    /// plugin.
    pub async fn register_bundled_defaults(&self) -> Result<(), DispatchError> {
        self.register_all(HookPoint::ALL, Arc::new(AuditLogPlugin::new()))
            .await
    }
}
