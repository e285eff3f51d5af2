//! Per-entity callback declarations.
//!
//! A [`CallbackSet`] is the hook-point registry of a single agent, model or
//! tool. It holds exactly one declaration for every hook point its kind
//! exposes and is frozen once built; the canonical chain of each point is
//! computed at build time and reused for every dispatch.

use std::collections::HashMap;

use serde_json::Value;

use crate::callbacks::chain::CallbackChain;
use crate::callbacks::context::{CallContext, json_is_meaningful};
use crate::callbacks::declaration::CallbackDeclaration;
use crate::callbacks::handler::{EntityRef, SharedCallback, SharedPluginCallback};
use crate::callbacks::hook_point::{EntityKind, HookPoint};
use crate::config::DEFAULT_MAX_CHAIN_LEN;
use crate::error::DispatchError;

/// Entity-scoped handler for agent, model and tool hooks.
pub type Handler = SharedCallback<CallContext, Value>;

/// Process-wide plugin handler for agent, model and tool hooks.
pub type PluginHandler = SharedPluginCallback<CallContext, Value>;

/// Canonical chain over [`CallContext`] with JSON results.
pub type HandlerChain = CallbackChain<CallContext, Value>;

/// Frozen callback declarations of one entity.
pub struct CallbackSet {
    entity: EntityRef,
    declarations: HashMap<HookPoint, CallbackDeclaration<Handler>>,
    chains: HashMap<HookPoint, HandlerChain>,
}

impl CallbackSet {
    pub fn builder(kind: EntityKind, name: impl Into<String>) -> CallbackSetBuilder {
        CallbackSetBuilder {
            entity: EntityRef::new(kind, name),
            declarations: HashMap::new(),
            max_chain_len: DEFAULT_MAX_CHAIN_LEN,
        }
    }

    /// A set with every hook point absent.
    pub fn empty(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::builder(kind, name).build()
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn kind(&self) -> EntityKind {
        self.entity.kind
    }

    pub fn name(&self) -> &str {
        &self.entity.name
    }

    /// Hook points this entity exposes.
    pub fn hook_points(&self) -> impl Iterator<Item = HookPoint> {
        self.entity.kind.hook_points()
    }

    /// The declaration for `point` exactly as it was given.
    pub fn declaration(
        &self,
        point: HookPoint,
    ) -> Result<&CallbackDeclaration<Handler>, DispatchError> {
        self.declarations
            .get(&point)
            .ok_or(DispatchError::InvalidHookPoint {
                point,
                kind: self.entity.kind,
            })
    }

    /// The cached canonical chain for `point`.
    pub fn chain(&self, point: HookPoint) -> Result<&HandlerChain, DispatchError> {
        self.chains
            .get(&point)
            .ok_or(DispatchError::InvalidHookPoint {
                point,
                kind: self.entity.kind,
            })
    }

    /// The normalised handlers for `point`, in execution order.
    pub fn canonical_callbacks(&self, point: HookPoint) -> Result<&[Handler], DispatchError> {
        self.chain(point).map(|chain| chain.handlers())
    }

    #[deprecated(since = "0.2.0", note = "use `canonical_callbacks(HookPoint::BEFORE_AGENT)`")]
    pub fn canonical_before_agent_callbacks(&self) -> Result<&[Handler], DispatchError> {
        self.canonical_callbacks(HookPoint::BEFORE_AGENT)
    }

    #[deprecated(since = "0.2.0", note = "use `canonical_callbacks(HookPoint::AFTER_AGENT)`")]
    pub fn canonical_after_agent_callbacks(&self) -> Result<&[Handler], DispatchError> {
        self.canonical_callbacks(HookPoint::AFTER_AGENT)
    }

    #[deprecated(since = "0.2.0", note = "use `canonical_callbacks(HookPoint::BEFORE_MODEL)`")]
    pub fn canonical_before_model_callbacks(&self) -> Result<&[Handler], DispatchError> {
        self.canonical_callbacks(HookPoint::BEFORE_MODEL)
    }

    #[deprecated(since = "0.2.0", note = "use `canonical_callbacks(HookPoint::AFTER_MODEL)`")]
    pub fn canonical_after_model_callbacks(&self) -> Result<&[Handler], DispatchError> {
        self.canonical_callbacks(HookPoint::AFTER_MODEL)
    }

    #[deprecated(since = "0.2.0", note = "use `canonical_callbacks(HookPoint::BEFORE_TOOL)`")]
    pub fn canonical_before_tool_callbacks(&self) -> Result<&[Handler], DispatchError> {
        self.canonical_callbacks(HookPoint::BEFORE_TOOL)
    }

    #[deprecated(since = "0.2.0", note = "use `canonical_callbacks(HookPoint::AFTER_TOOL)`")]
    pub fn canonical_after_tool_callbacks(&self) -> Result<&[Handler], DispatchError> {
        self.canonical_callbacks(HookPoint::AFTER_TOOL)
    }
}

impl std::fmt::Debug for CallbackSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for point in self.hook_points() {
            if let Some(chain) = self.chains.get(&point) {
                map.entry(&point.as_str(), chain);
            }
        }
        map.finish()
    }
}

/// Collects declarations for a [`CallbackSet`].
pub struct CallbackSetBuilder {
    entity: EntityRef,
    declarations: HashMap<HookPoint, CallbackDeclaration<Handler>>,
    max_chain_len: usize,
}

impl CallbackSetBuilder {
    /// Cap on handlers per declaration.
    pub fn max_chain_len(mut self, max: usize) -> Self {
        self.max_chain_len = max;
        self
    }

    /// Declare the callbacks for `point`.
    ///
    /// Fails if the point does not belong to this entity's kind, if it was
    /// already declared, or if the declaration is longer than the cap.
    pub fn declare(
        mut self,
        point: HookPoint,
        decl: impl Into<CallbackDeclaration<Handler>>,
    ) -> Result<Self, DispatchError> {
        if !point.applies_to(self.entity.kind) {
            return Err(DispatchError::InvalidHookPoint {
                point,
                kind: self.entity.kind,
            });
        }
        if self.declarations.contains_key(&point) {
            return Err(DispatchError::declaration(format!(
                "{} declared twice for {}",
                point, self.entity
            )));
        }
        let decl = decl.into();
        decl.check_len(self.max_chain_len)?;
        self.declarations.insert(point, decl);
        Ok(self)
    }

    /// Shorthand for declaring a single handler.
    pub fn with(self, point: HookPoint, handler: Handler) -> Result<Self, DispatchError> {
        self.declare(point, CallbackDeclaration::Single(handler))
    }

    /// Freeze the declarations and precompute the canonical chains.
    pub fn build(mut self) -> CallbackSet {
        let mut chains = HashMap::new();
        for point in self.entity.kind.hook_points() {
            let decl = self.declarations.entry(point).or_default();
            chains.insert(
                point,
                CallbackChain::from_declaration(decl).with_policy(json_is_meaningful),
            );
        }
        CallbackSet {
            entity: self.entity,
            declarations: self.declarations,
            chains,
        }
    }
}
