//! Callback dispatch engine for agent orchestration runtimes.
//!
//! Declares, normalises and executes the before/after hooks that run around
//! agent execution, model invocation and tool invocation, with a process-wide
//! plugin tier consulted ahead of each entity's own callbacks.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use agent_callbacks::callbacks::{
//!     CallContext, CallbackSet, Dispatcher, EntityKind, HookPoint, PluginRegistry, from_fn,
//! };
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), agent_callbacks::error::DispatchError> {
//! let guard = from_fn("guard", |ctx: &CallContext| {
//!     Ok(ctx.state().get("blocked").map(|_| json!({"error": "blocked"})))
//! });
//! let tool = CallbackSet::builder(EntityKind::Tool, "search")
//!     .with(HookPoint::BEFORE_TOOL, guard)?
//!     .build();
//!
//! let dispatcher = Dispatcher::new(Arc::new(PluginRegistry::new()));
//! let ctx = CallContext::tool_call("search", json!({"q": "rust"}));
//! let answer = dispatcher.dispatch(HookPoint::BEFORE_TOOL, &tool, &ctx).await?;
//! assert!(answer.is_none());
//! # Ok(())
//! # }
//! ```

pub mod callbacks;
pub mod config;
pub mod error;
pub mod logging;

pub use config::CallbackConfig;
pub use error::{ConfigError, DispatchError, Error, Result};
