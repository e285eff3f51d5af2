//! Callback hooks around agent runs, model calls and tool calls.
//!
//! Every entity declares, per hook point, nothing, one handler or an ordered
//! list of handlers:
//!
//! - **BeforeAgent** / **AfterAgent**: around an agent run
//! - **BeforeModel** / **AfterModel**: around a model call
//! - **BeforeTool** / **AfterTool**: around a tool call, standard or streaming
//!
//! A dispatch first consults the process-wide plugin for the hook point, then
//! runs the entity's handlers in order. The first handler to return a value
//! answers the dispatch and the rest are skipped; a handler error aborts it.

pub mod bundled;
pub mod chain;
pub mod context;
pub mod declaration;
pub mod dispatcher;
pub mod entity;
pub mod handler;
pub mod hook_point;
pub mod integrator;
pub mod manifest;
pub mod plugin;

pub use bundled::AuditLogPlugin;
pub use chain::{CallbackChain, MeaningfulPolicy, any_value};
pub use context::{CallContext, HookPayload, SessionState, json_is_meaningful};
pub use declaration::{CallbackDeclaration, normalize};
pub use dispatcher::Dispatcher;
pub use entity::{CallbackSet, CallbackSetBuilder, Handler, HandlerChain, PluginHandler};
pub use handler::{
    Callback, EntityRef, HandlerResult, PluginCallback, SharedCallback, SharedPluginCallback,
    from_async_fn, from_fn, plugin_from_async_fn, plugin_from_fn,
};
pub use hook_point::{EntityKind, HookKind, HookPoint, HookVariant};
pub use integrator::{BoundPlugin, dispatch};
pub use manifest::{HandlerCatalog, Manifest};
pub use plugin::PluginRegistry;
