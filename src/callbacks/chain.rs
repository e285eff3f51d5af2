//! Ordered, short-circuiting execution of a canonical callback chain.
//!
//! Every tier and every hook point goes through [`invoke`]: it runs one
//! handler, awaits it (a synchronous handler resolves on first poll), applies
//! the meaningful-result policy and honours cancellation. [`CallbackChain`]
//! is nothing more than that primitive applied in declaration order until a
//! handler answers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::callbacks::declaration::CallbackDeclaration;
use crate::callbacks::handler::{Callback, SharedCallback};
use crate::callbacks::hook_point::HookPoint;
use crate::error::DispatchError;

/// Decides whether a returned value stops the chain.
pub type MeaningfulPolicy<R> = fn(&R) -> bool;

/// Default policy: any value that is present is meaningful.
pub fn any_value<R>(_: &R) -> bool {
    true
}

/// Which tier a handler belongs to, for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tier {
    Plugin,
    Entity,
}

impl Tier {
    fn as_str(self) -> &'static str {
        match self {
            Tier::Plugin => "plugin",
            Tier::Entity => "entity",
        }
    }
}

/// Position of a single invocation within a dispatch.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Step {
    pub point: HookPoint,
    pub tier: Tier,
    /// Handlers already started in this dispatch before this one.
    pub started: usize,
}

/// Run one handler.
///
/// Returns `Ok(Some(_))` only for results the policy deems meaningful.
/// Handler errors come back as [`DispatchError::Handler`] carrying the
/// original error.
pub(crate) async fn invoke<C, R>(
    handler: &dyn Callback<C, R>,
    ctx: &C,
    policy: MeaningfulPolicy<R>,
    step: Step,
    cancel: Option<&CancellationToken>,
) -> Result<Option<R>, DispatchError>
where
    C: ?Sized + Sync,
    R: Send,
{
    tracing::trace!(
        point = %step.point,
        tier = step.tier.as_str(),
        index = step.started,
        handler = handler.name(),
        "Invoking callback"
    );

    let outcome = match cancel {
        Some(token) if token.is_cancelled() => {
            return Err(cancelled(step.point, step.started));
        }
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Err(cancelled(step.point, step.started + 1));
                }
                outcome = handler.call(ctx) => outcome,
            }
        }
        None => handler.call(ctx).await,
    };

    match outcome {
        Ok(Some(value)) if policy(&value) => Ok(Some(value)),
        Ok(_) => Ok(None),
        Err(err) => {
            tracing::warn!(
                point = %step.point,
                tier = step.tier.as_str(),
                handler = handler.name(),
                "Callback failed: {:#}",
                err
            );
            Err(DispatchError::Handler(err))
        }
    }
}

fn cancelled(point: HookPoint, invoked: usize) -> DispatchError {
    tracing::warn!(point = %point, invoked, "Callback dispatch cancelled");
    DispatchError::Cancelled { point, invoked }
}

/// A canonical, immutable sequence of handlers plus the rule that decides
/// which results short-circuit it.
///
/// Cloning is cheap and the chain holds no per-call state, so one chain can
/// be executed concurrently for any number of independent contexts.
pub struct CallbackChain<C: ?Sized, R> {
    handlers: Arc<[SharedCallback<C, R>]>,
    policy: MeaningfulPolicy<R>,
}

impl<C: ?Sized + Sync, R: Send> CallbackChain<C, R> {
    pub fn new(handlers: impl Into<Arc<[SharedCallback<C, R>]>>) -> Self {
        Self {
            handlers: handlers.into(),
            policy: any_value::<R>,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Normalise a declaration into a chain.
    pub fn from_declaration(decl: &CallbackDeclaration<SharedCallback<C, R>>) -> Self {
        Self::new(decl.normalize().to_vec())
    }

    /// Replace the meaningful-result policy.
    pub fn with_policy(mut self, policy: MeaningfulPolicy<R>) -> Self {
        self.policy = policy;
        self
    }

    pub fn handlers(&self) -> &[SharedCallback<C, R>] {
        &self.handlers
    }

    pub fn policy(&self) -> MeaningfulPolicy<R> {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handlers in order until one returns a meaningful result.
    ///
    /// The first error aborts the chain and is returned as-is; handlers after
    /// the answering or failing one are never invoked.
    pub async fn execute(&self, point: HookPoint, ctx: &C) -> Result<Option<R>, DispatchError> {
        self.run(point, ctx, None, 0).await
    }

    /// Like [`execute`](Self::execute), but stops as soon as `cancel` fires.
    ///
    /// An in-flight handler is dropped at its next suspension point and no
    /// further handler is started.
    pub async fn execute_cancellable(
        &self,
        point: HookPoint,
        ctx: &C,
        cancel: &CancellationToken,
    ) -> Result<Option<R>, DispatchError> {
        self.run(point, ctx, Some(cancel), 0).await
    }

    pub(crate) async fn run(
        &self,
        point: HookPoint,
        ctx: &C,
        cancel: Option<&CancellationToken>,
        started: usize,
    ) -> Result<Option<R>, DispatchError> {
        run_chain(&self.handlers, self.policy, point, ctx, cancel, started).await
    }
}

/// The single early-exit loop shared by every chain.
async fn run_chain<C, R>(
    handlers: &[SharedCallback<C, R>],
    policy: MeaningfulPolicy<R>,
    point: HookPoint,
    ctx: &C,
    cancel: Option<&CancellationToken>,
    started: usize,
) -> Result<Option<R>, DispatchError>
where
    C: ?Sized + Sync,
    R: Send,
{
    for (index, handler) in handlers.iter().enumerate() {
        let step = Step {
            point,
            tier: Tier::Entity,
            started: started + index,
        };
        if let Some(value) = invoke(handler.as_ref(), ctx, policy, step, cancel).await? {
            tracing::debug!(
                point = %point,
                handler = handler.name(),
                index,
                "Callback short-circuited chain"
            );
            return Ok(Some(value));
        }
    }
    Ok(None)
}

impl<C: ?Sized, R> Clone for CallbackChain<C, R> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
            policy: self.policy,
        }
    }
}

impl<C: ?Sized, R> std::fmt::Debug for CallbackChain<C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

/// Free-function form: normalise `decl` and execute it with the default
/// policy.
pub async fn execute<C, R>(
    decl: &CallbackDeclaration<SharedCallback<C, R>>,
    point: HookPoint,
    ctx: &C,
) -> Result<Option<R>, DispatchError>
where
    C: ?Sized + Sync,
    R: Send,
{
    run_chain(decl.normalize(), any_value::<R>, point, ctx, None, 0).await
}
