//! Two-tier dispatch: the process-wide plugin first, then the entity chain.
//!
//! Plugin callbacks take the entity identity as an extra argument, entity
//! callbacks do not. [`BoundPlugin`] binds the identity up front so the
//! plugin looks like any other [`Callback`] and runs through the same
//! invocation primitive as the entity chain.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::callbacks::chain::{self, CallbackChain, Step, Tier};
use crate::callbacks::handler::{Callback, EntityRef, HandlerResult, PluginCallback};
use crate::callbacks::hook_point::HookPoint;
use crate::error::DispatchError;

/// A plugin callback with its entity argument already supplied.
pub struct BoundPlugin<'a, C: ?Sized, R> {
    plugin: &'a dyn PluginCallback<C, R>,
    entity: &'a EntityRef,
}

impl<'a, C: ?Sized, R> BoundPlugin<'a, C, R> {
    pub fn new(plugin: &'a dyn PluginCallback<C, R>, entity: &'a EntityRef) -> Self {
        Self { plugin, entity }
    }
}

#[async_trait]
impl<'a, C, R> Callback<C, R> for BoundPlugin<'a, C, R>
where
    C: ?Sized + Sync,
    R: Send,
{
    fn name(&self) -> &str {
        self.plugin.name()
    }

    async fn call(&self, ctx: &C) -> HandlerResult<R> {
        self.plugin.call(self.entity, ctx).await
    }
}

/// Dispatch `point` for `entity`.
///
/// 1. The hook point must belong to the entity's kind; otherwise nothing runs.
/// 2. If a plugin is present it runs first. A meaningful plugin result is
///    returned and the entity chain is skipped.
/// 3. Otherwise the entity chain runs and its result is returned.
///
/// Both tiers use the chain's meaningful-result policy.
pub async fn dispatch<C, R>(
    point: HookPoint,
    plugin: Option<&dyn PluginCallback<C, R>>,
    entity: &EntityRef,
    entity_chain: &CallbackChain<C, R>,
    ctx: &C,
    cancel: Option<&CancellationToken>,
) -> Result<Option<R>, DispatchError>
where
    C: ?Sized + Sync,
    R: Send,
{
    if !point.applies_to(entity.kind) {
        return Err(DispatchError::InvalidHookPoint {
            point,
            kind: entity.kind,
        });
    }

    let mut started = 0;
    if let Some(plugin) = plugin {
        let bound = BoundPlugin::new(plugin, entity);
        let step = Step {
            point,
            tier: Tier::Plugin,
            started,
        };
        if let Some(value) =
            chain::invoke(&bound, ctx, entity_chain.policy(), step, cancel).await?
        {
            tracing::debug!(
                point = %point,
                plugin = plugin.name(),
                entity = %entity,
                "Plugin answered, skipping entity callbacks"
            );
            return Ok(Some(value));
        }
        started = 1;
    }

    entity_chain.run(point, ctx, cancel, started).await
}
