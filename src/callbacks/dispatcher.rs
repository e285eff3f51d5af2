//! Dispatch entry point used by the orchestration loop.

use std::sync::Arc;

use serde_json::Value;

use crate::callbacks::context::CallContext;
use crate::callbacks::entity::CallbackSet;
use crate::callbacks::hook_point::HookPoint;
use crate::callbacks::integrator;
use crate::callbacks::plugin::PluginRegistry;
use crate::error::DispatchError;

/// Runs the plugin tier and then an entity's callbacks for one hook point.
///
/// Cheap to clone; every clone shares the same plugin registry.
#[derive(Clone)]
pub struct Dispatcher {
    plugins: Arc<PluginRegistry>,
}

impl Dispatcher {
    pub fn new(plugins: Arc<PluginRegistry>) -> Self {
        Self { plugins }
    }

    /// A dispatcher with an empty plugin registry.
    pub fn without_plugins() -> Self {
        Self::new(Arc::new(PluginRegistry::new()))
    }

    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    /// Dispatch `point` for `entity` with `ctx`.
    ///
    /// Returns `Ok(Some(value))` when a plugin or entity callback answered,
    /// `Ok(None)` when every handler passed. The hook point and the context
    /// payload are validated before any handler runs. Cancelling the
    /// context's token stops the dispatch.
    pub async fn dispatch(
        &self,
        point: HookPoint,
        entity: &CallbackSet,
        ctx: &CallContext,
    ) -> Result<Option<Value>, DispatchError> {
        let chain = entity.chain(point)?;
        if !ctx.payload().matches(point) {
            return Err(DispatchError::ContextMismatch {
                point,
                payload: ctx.payload().name(),
            });
        }

        // The registry's read guard is released inside `get`; no handler
        // ever runs while it is held.
        let plugin = self.plugins.get(point).await;
        integrator::dispatch(
            point,
            plugin.as_deref(),
            entity.entity(),
            chain,
            ctx,
            Some(ctx.cancellation()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::callbacks::entity::{Handler, PluginHandler};
    use crate::callbacks::handler::{from_fn, plugin_from_async_fn, plugin_from_fn};
    use crate::callbacks::hook_point::EntityKind;

    fn counting(counter: &Arc<AtomicUsize>, reply: Value) -> Handler {
        let counter = Arc::clone(counter);
        from_fn("counting", move |_: &CallContext| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(reply.clone()))
        })
    }

    #[tokio::test]
    async fn plugin_short_circuits_entity_callbacks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = CallbackSet::builder(EntityKind::Model, "gemini")
            .with(HookPoint::BEFORE_MODEL, counting(&calls, json!("entity")))
            .unwrap()
            .build();

        let dispatcher = Dispatcher::without_plugins();
        let plugin: PluginHandler =
            plugin_from_fn("cache", |_, _: &CallContext| Ok(Some(json!("cached"))));
        dispatcher
            .plugins()
            .register(HookPoint::BEFORE_MODEL, plugin)
            .await
            .unwrap();

        let ctx = CallContext::model_request("gemini", json!({"contents": []}));
        let result = dispatcher
            .dispatch(HookPoint::BEFORE_MODEL, &model, &ctx)
            .await
            .unwrap();

        assert_eq!(result, Some(json!("cached")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn null_results_continue_the_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let agent = CallbackSet::builder(EntityKind::Agent, "root")
            .declare(
                HookPoint::AFTER_AGENT,
                vec![
                    counting(&calls, Value::Null),
                    counting(&calls, json!({"text": "done"})),
                ],
            )
            .unwrap()
            .build();

        let result = Dispatcher::without_plugins()
            .dispatch(
                HookPoint::AFTER_AGENT,
                &agent,
                &CallContext::agent("root", "inv-1"),
            )
            .await
            .unwrap();

        assert_eq!(result, Some(json!({"text": "done"})));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mismatched_payload_is_rejected_before_handlers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tool = CallbackSet::builder(EntityKind::Tool, "search")
            .with(HookPoint::AFTER_TOOL, counting(&calls, json!(1)))
            .unwrap()
            .build();

        let err = Dispatcher::without_plugins()
            .dispatch(
                HookPoint::AFTER_TOOL,
                &tool,
                &CallContext::tool_call("search", json!({})),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::ContextMismatch {
                payload: "tool_call",
                ..
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_context_runs_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tool = CallbackSet::builder(EntityKind::Tool, "search")
            .with(HookPoint::BEFORE_TOOL, counting(&calls, json!(1)))
            .unwrap()
            .build();
        let ctx = CallContext::tool_call("search", json!({}));
        ctx.cancel();

        let err = Dispatcher::without_plugins()
            .dispatch(HookPoint::BEFORE_TOOL, &tool, &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Cancelled { invoked: 0, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn plugin_can_register_while_it_runs() {
        let dispatcher = Dispatcher::without_plugins();
        let registry = Arc::clone(dispatcher.plugins());
        let plugin = plugin_from_async_fn::<CallContext, Value, _>("installer", move |_, _| {
            let registry = Arc::clone(&registry);
            Box::pin(async move {
                let late: PluginHandler =
                    plugin_from_fn("late", |_, _: &CallContext| Ok(None::<Value>));
                registry.register(HookPoint::AFTER_MODEL, late).await?;
                Ok(None)
            })
        });
        dispatcher
            .plugins()
            .register(HookPoint::BEFORE_MODEL, plugin)
            .await
            .unwrap();

        let model = CallbackSet::empty(EntityKind::Model, "gemini");
        let ctx = CallContext::model_request("gemini", json!({"contents": []}));
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            dispatcher.dispatch(HookPoint::BEFORE_MODEL, &model, &ctx),
        )
        .await
        .expect("dispatch held the registry lock while the plugin ran")
        .unwrap();

        assert!(result.is_none());
        assert!(dispatcher.plugins().get(HookPoint::AFTER_MODEL).await.is_some());
    }
}
