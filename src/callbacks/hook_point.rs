//! The closed set of hook points an entity can expose.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The six base positions where callbacks may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    /// Before the agent starts its run.
    BeforeAgent,
    /// After the agent finished its run.
    AfterAgent,
    /// Before a request is sent to the model.
    BeforeModel,
    /// After the model produced a response.
    AfterModel,
    /// Before a tool is invoked.
    BeforeTool,
    /// After a tool returned.
    AfterTool,
}

impl HookKind {
    /// The kind of entity that exposes this hook.
    pub fn entity_kind(self) -> EntityKind {
        match self {
            HookKind::BeforeAgent | HookKind::AfterAgent => EntityKind::Agent,
            HookKind::BeforeModel | HookKind::AfterModel => EntityKind::Model,
            HookKind::BeforeTool | HookKind::AfterTool => EntityKind::Tool,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::BeforeAgent => "before_agent",
            HookKind::AfterAgent => "after_agent",
            HookKind::BeforeModel => "before_model",
            HookKind::AfterModel => "after_model",
            HookKind::BeforeTool => "before_tool",
            HookKind::AfterTool => "after_tool",
        }
    }

    /// Whether this hook also exists in a streaming variant.
    pub fn has_streaming_variant(self) -> bool {
        self.entity_kind() == EntityKind::Tool
    }
}

/// Standard or streaming execution of the hooked step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookVariant {
    #[default]
    Standard,
    Streaming,
}

/// Kinds of entities that own callback declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Agent,
    Model,
    Tool,
}

impl EntityKind {
    /// Every hook point an entity of this kind exposes, in declaration order.
    pub fn hook_points(self) -> impl Iterator<Item = HookPoint> {
        HookPoint::ALL
            .iter()
            .copied()
            .filter(move |p| p.kind.entity_kind() == self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Agent => "agent",
            EntityKind::Model => "model",
            EntityKind::Tool => "tool",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named position in an entity's execution.
///
/// The set is fixed at compile time: agent and model hooks only come in the
/// standard variant, tool hooks in both. [`HookPoint::ALL`] enumerates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HookPoint {
    pub kind: HookKind,
    pub variant: HookVariant,
}

impl HookPoint {
    pub const BEFORE_AGENT: Self = Self::standard(HookKind::BeforeAgent);
    pub const AFTER_AGENT: Self = Self::standard(HookKind::AfterAgent);
    pub const BEFORE_MODEL: Self = Self::standard(HookKind::BeforeModel);
    pub const AFTER_MODEL: Self = Self::standard(HookKind::AfterModel);
    pub const BEFORE_TOOL: Self = Self::standard(HookKind::BeforeTool);
    pub const AFTER_TOOL: Self = Self::standard(HookKind::AfterTool);
    pub const BEFORE_TOOL_STREAMING: Self = Self::streaming(HookKind::BeforeTool);
    pub const AFTER_TOOL_STREAMING: Self = Self::streaming(HookKind::AfterTool);

    /// All valid hook points.
    pub const ALL: [HookPoint; 8] = [
        Self::BEFORE_AGENT,
        Self::AFTER_AGENT,
        Self::BEFORE_MODEL,
        Self::AFTER_MODEL,
        Self::BEFORE_TOOL,
        Self::AFTER_TOOL,
        Self::BEFORE_TOOL_STREAMING,
        Self::AFTER_TOOL_STREAMING,
    ];

    const fn standard(kind: HookKind) -> Self {
        Self {
            kind,
            variant: HookVariant::Standard,
        }
    }

    const fn streaming(kind: HookKind) -> Self {
        Self {
            kind,
            variant: HookVariant::Streaming,
        }
    }

    /// Build a hook point, returning `None` for combinations outside the
    /// closed set (a streaming agent or model hook).
    pub fn new(kind: HookKind, variant: HookVariant) -> Option<Self> {
        match variant {
            HookVariant::Standard => Some(Self::standard(kind)),
            HookVariant::Streaming if kind.has_streaming_variant() => Some(Self::streaming(kind)),
            HookVariant::Streaming => None,
        }
    }

    pub fn entity_kind(self) -> EntityKind {
        self.kind.entity_kind()
    }

    /// Whether an entity of `kind` exposes this hook point.
    pub fn applies_to(self, kind: EntityKind) -> bool {
        self.entity_kind() == kind
    }

    /// Stable name used in manifests and log fields, e.g. `after_tool_streaming`.
    pub fn as_str(self) -> &'static str {
        match (self.kind, self.variant) {
            (HookKind::BeforeTool, HookVariant::Streaming) => "before_tool_streaming",
            (HookKind::AfterTool, HookVariant::Streaming) => "after_tool_streaming",
            (kind, _) => kind.as_str(),
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookPoint::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown hook point '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_point_round_trips_through_its_name() {
        for point in HookPoint::ALL {
            assert_eq!(point.as_str().parse::<HookPoint>().unwrap(), point);
        }
    }

    #[test]
    fn streaming_only_exists_for_tool_hooks() {
        assert!(HookPoint::new(HookKind::BeforeModel, HookVariant::Streaming).is_none());
        assert!(HookPoint::new(HookKind::AfterAgent, HookVariant::Streaming).is_none());
        assert_eq!(
            HookPoint::new(HookKind::AfterTool, HookVariant::Streaming),
            Some(HookPoint::AFTER_TOOL_STREAMING)
        );
    }

    #[test]
    fn entity_kinds_partition_the_hook_points() {
        let agent: Vec<_> = EntityKind::Agent.hook_points().collect();
        let model: Vec<_> = EntityKind::Model.hook_points().collect();
        let tool: Vec<_> = EntityKind::Tool.hook_points().collect();

        assert_eq!(agent, vec![HookPoint::BEFORE_AGENT, HookPoint::AFTER_AGENT]);
        assert_eq!(model, vec![HookPoint::BEFORE_MODEL, HookPoint::AFTER_MODEL]);
        assert_eq!(tool.len(), 4);
        assert_eq!(agent.len() + model.len() + tool.len(), HookPoint::ALL.len());
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!("before_agent_streaming".parse::<HookPoint>().is_err());
        assert!("on_error".parse::<HookPoint>().is_err());
    }

    #[test]
    fn applies_to_matches_kind() {
        assert!(HookPoint::BEFORE_TOOL_STREAMING.applies_to(EntityKind::Tool));
        assert!(!HookPoint::BEFORE_MODEL.applies_to(EntityKind::Agent));
    }
}
