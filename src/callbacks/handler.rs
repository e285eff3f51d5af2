//! Handler shapes.
//!
//! Entity-scoped handlers implement [`Callback`] and see only the call
//! context. Process-wide plugin handlers implement [`PluginCallback`] and
//! additionally receive the identity of the entity being dispatched. Both
//! shapes cover synchronous and asynchronous logic: a synchronous handler is
//! simply one whose future is ready on first poll, so the chain never has to
//! tell them apart.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::callbacks::hook_point::EntityKind;

/// What a handler returns: `Ok(Some(_))` stops the chain, `Ok(None)` lets it
/// continue, `Err(_)` aborts the dispatch.
pub type HandlerResult<R> = anyhow::Result<Option<R>>;

/// An entity-scoped callback.
#[async_trait]
pub trait Callback<C: ?Sized, R>: Send + Sync {
    /// Name used in log fields.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn call(&self, ctx: &C) -> HandlerResult<R>;
}

/// Identity of the entity a dispatch runs for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub name: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// A process-wide plugin callback. Unlike [`Callback`] it is told which
/// entity the dispatch belongs to.
#[async_trait]
pub trait PluginCallback<C: ?Sized, R>: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn call(&self, entity: &EntityRef, ctx: &C) -> HandlerResult<R>;
}

/// Shared handle to an entity-scoped callback.
pub type SharedCallback<C, R> = Arc<dyn Callback<C, R>>;

/// Shared handle to a plugin callback.
pub type SharedPluginCallback<C, R> = Arc<dyn PluginCallback<C, R>>;

struct SyncFn<F, C: ?Sized, R> {
    name: String,
    f: F,
    _marker: PhantomData<fn(&C) -> R>,
}

#[async_trait]
impl<F, C, R> Callback<C, R> for SyncFn<F, C, R>
where
    F: Fn(&C) -> HandlerResult<R> + Send + Sync,
    C: ?Sized + Sync,
    R: Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, ctx: &C) -> HandlerResult<R> {
        (self.f)(ctx)
    }
}

struct AsyncFn<F, C: ?Sized, R> {
    name: String,
    f: F,
    _marker: PhantomData<fn(&C) -> R>,
}

#[async_trait]
impl<F, C, R> Callback<C, R> for AsyncFn<F, C, R>
where
    F: for<'a> Fn(&'a C) -> BoxFuture<'a, HandlerResult<R>> + Send + Sync,
    C: ?Sized + Sync,
    R: Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, ctx: &C) -> HandlerResult<R> {
        (self.f)(ctx).await
    }
}

/// Wrap a synchronous closure as a callback.
pub fn from_fn<C, R, F>(name: impl Into<String>, f: F) -> SharedCallback<C, R>
where
    F: Fn(&C) -> HandlerResult<R> + Send + Sync + 'static,
    C: ?Sized + Sync + 'static,
    R: Send + 'static,
{
    Arc::new(SyncFn {
        name: name.into(),
        f,
        _marker: PhantomData,
    })
}

/// Wrap an asynchronous closure as a callback.
///
/// The closure returns a boxed future borrowing the context:
/// `|ctx| Box::pin(async move { ... })`.
pub fn from_async_fn<C, R, F>(name: impl Into<String>, f: F) -> SharedCallback<C, R>
where
    F: for<'a> Fn(&'a C) -> BoxFuture<'a, HandlerResult<R>> + Send + Sync + 'static,
    C: ?Sized + Sync + 'static,
    R: Send + 'static,
{
    Arc::new(AsyncFn {
        name: name.into(),
        f,
        _marker: PhantomData,
    })
}

struct SyncPluginFn<F, C: ?Sized, R> {
    name: String,
    f: F,
    _marker: PhantomData<fn(&C) -> R>,
}

#[async_trait]
impl<F, C, R> PluginCallback<C, R> for SyncPluginFn<F, C, R>
where
    F: Fn(&EntityRef, &C) -> HandlerResult<R> + Send + Sync,
    C: ?Sized + Sync,
    R: Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, entity: &EntityRef, ctx: &C) -> HandlerResult<R> {
        (self.f)(entity, ctx)
    }
}

struct AsyncPluginFn<F, C: ?Sized, R> {
    name: String,
    f: F,
    _marker: PhantomData<fn(&C) -> R>,
}

#[async_trait]
impl<F, C, R> PluginCallback<C, R> for AsyncPluginFn<F, C, R>
where
    F: for<'a> Fn(&'a EntityRef, &'a C) -> BoxFuture<'a, HandlerResult<R>> + Send + Sync,
    C: ?Sized + Sync,
    R: Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, entity: &EntityRef, ctx: &C) -> HandlerResult<R> {
        (self.f)(entity, ctx).await
    }
}

/// Wrap a synchronous closure as a plugin callback.
pub fn plugin_from_fn<C, R, F>(name: impl Into<String>, f: F) -> SharedPluginCallback<C, R>
where
    F: Fn(&EntityRef, &C) -> HandlerResult<R> + Send + Sync + 'static,
    C: ?Sized + Sync + 'static,
    R: Send + 'static,
{
    Arc::new(SyncPluginFn {
        name: name.into(),
        f,
        _marker: PhantomData,
    })
}

/// Wrap an asynchronous closure as a plugin callback.
pub fn plugin_from_async_fn<C, R, F>(name: impl Into<String>, f: F) -> SharedPluginCallback<C, R>
where
    F: for<'a> Fn(&'a EntityRef, &'a C) -> BoxFuture<'a, HandlerResult<R>>
        + Send
        + Sync
        + 'static,
    C: ?Sized + Sync + 'static,
    R: Send + 'static,
{
    Arc::new(AsyncPluginFn {
        name: name.into(),
        f,
        _marker: PhantomData,
    })
}
