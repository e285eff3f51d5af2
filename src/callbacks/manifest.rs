//! Declarative callback manifests.
//!
//! A manifest lists entities and, per hook point, the names of the handlers
//! to run. Names are resolved against a [`HandlerCatalog`]:
//!
//! ```toml
//! [[entity]]
//! kind = "tool"
//! name = "search"
//!
//! [entity.callbacks]
//! before_tool = "audit"
//! after_tool_streaming = ["redact", "audit"]
//! ```
//!
//! A value is either one handler name or an ordered list of names. Anything
//! else, an unknown name, or a hook point the entity kind does not expose
//! rejects the whole manifest.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::callbacks::declaration::CallbackDeclaration;
use crate::callbacks::entity::{CallbackSet, Handler};
use crate::callbacks::hook_point::{EntityKind, HookPoint};
use crate::config::CallbackConfig;
use crate::error::{ConfigError, DispatchError};

/// Named handlers available to manifests.
#[derive(Default, Clone)]
pub struct HandlerCatalog {
    handlers: HashMap<String, Handler>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `handler` under `name`, returning the handler it replaced.
    pub fn register(&mut self, name: impl Into<String>, handler: Handler) -> Option<Handler> {
        self.handlers.insert(name.into(), handler)
    }

    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn resolve(&self, entity: &str, name: &str) -> Result<Handler, DispatchError> {
        self.handlers.get(name).cloned().ok_or_else(|| {
            DispatchError::declaration(format!("{entity}: unknown handler '{name}'"))
        })
    }
}

/// Parsed manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntitySpec>,
}

/// One entity in a manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitySpec {
    pub kind: EntityKind,
    pub name: String,
    /// Hook point name to declaration value.
    #[serde(default)]
    pub callbacks: BTreeMap<String, toml::Value>,
}

impl Manifest {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("invalid callback manifest: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load the manifest named by `config.manifest_path`, if any.
    pub fn from_config(config: &CallbackConfig) -> Result<Option<Self>, ConfigError> {
        config
            .manifest_path
            .as_deref()
            .map(Self::load)
            .transpose()
    }

    /// Resolve every entity against `catalog`.
    pub fn build(
        &self,
        catalog: &HandlerCatalog,
        config: &CallbackConfig,
    ) -> Result<Vec<CallbackSet>, DispatchError> {
        let mut seen = HashSet::new();
        let mut sets = Vec::with_capacity(self.entities.len());

        for entry in &self.entities {
            let label = format!("{}:{}", entry.kind, entry.name);
            if !seen.insert((entry.kind, entry.name.as_str())) {
                return Err(DispatchError::declaration(format!(
                    "{label}: entity declared twice"
                )));
            }

            let mut builder =
                CallbackSet::builder(entry.kind, &entry.name).max_chain_len(config.max_chain_len);
            for (key, value) in &entry.callbacks {
                let point: HookPoint = key
                    .parse()
                    .map_err(|e: String| DispatchError::declaration(format!("{label}: {e}")))?;
                if !point.applies_to(entry.kind) {
                    return Err(DispatchError::declaration(format!(
                        "{label}: {point} is not exposed by {} entities",
                        entry.kind
                    )));
                }
                let decl = parse_declaration(&label, key, value, catalog)?;
                builder = builder.declare(point, decl)?;
            }

            tracing::debug!(entity = %label, "Loaded callback declarations");
            sets.push(builder.build());
        }

        Ok(sets)
    }
}

fn parse_declaration(
    entity: &str,
    key: &str,
    value: &toml::Value,
    catalog: &HandlerCatalog,
) -> Result<CallbackDeclaration<Handler>, DispatchError> {
    match value {
        toml::Value::String(name) => Ok(CallbackDeclaration::Single(
            catalog.resolve(entity, name)?,
        )),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                toml::Value::String(name) => catalog.resolve(entity, name),
                other => Err(DispatchError::declaration(format!(
                    "{entity}: {key} list entries must be handler names, found {}",
                    other.type_str()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(CallbackDeclaration::Many),
        other => Err(DispatchError::declaration(format!(
            "{entity}: {key} must be a handler name or a list of handler names, found {}",
            other.type_str()
        ))),
    }
}

/// Find a built set by kind and name.
pub fn find<'a>(sets: &'a [CallbackSet], kind: EntityKind, name: &str) -> Option<&'a CallbackSet> {
    sets.iter().find(|s| s.kind() == kind && s.name() == name)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::callbacks::context::CallContext;
    use crate::callbacks::handler::from_fn;

    fn catalog() -> HandlerCatalog {
        let mut catalog = HandlerCatalog::new();
        catalog.register("audit", from_fn("audit", |_: &CallContext| Ok(None::<Value>)));
        catalog.register(
            "redact",
            from_fn("redact", |_: &CallContext| Ok(Some(json!("[redacted]")))),
        );
        catalog
    }

    const MANIFEST: &str = r#"
        [[entity]]
        kind = "tool"
        name = "search"

        [entity.callbacks]
        before_tool = "audit"
        after_tool_streaming = ["redact", "audit"]

        [[entity]]
        kind = "agent"
        name = "root"
    "#;

    #[test]
    fn builds_declared_entities() {
        let catalog = catalog();
        let sets = Manifest::from_toml_str(MANIFEST)
            .unwrap()
            .build(&catalog, &CallbackConfig::default())
            .unwrap();
        assert_eq!(sets.len(), 2);

        let search = find(&sets, EntityKind::Tool, "search").unwrap();
        let before = search.canonical_callbacks(HookPoint::BEFORE_TOOL).unwrap();
        assert!(Arc::ptr_eq(&before[0], catalog.get("audit").unwrap()));

        let streaming = search
            .canonical_callbacks(HookPoint::AFTER_TOOL_STREAMING)
            .unwrap();
        let names: Vec<&str> = streaming.iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["redact", "audit"]);

        let root = find(&sets, EntityKind::Agent, "root").unwrap();
        assert!(root.declaration(HookPoint::BEFORE_AGENT).unwrap().is_absent());
    }

    fn build_err(manifest: &str) -> DispatchError {
        Manifest::from_toml_str(manifest)
            .unwrap()
            .build(&catalog(), &CallbackConfig::default())
            .unwrap_err()
    }

    #[test]
    fn unknown_handler_is_rejected() {
        let err = build_err(
            r#"
            [[entity]]
            kind = "model"
            name = "gemini"
            callbacks = { before_model = "missing" }
            "#,
        );
        assert!(err.to_string().contains("unknown handler 'missing'"));
    }

    #[test]
    fn wrong_value_shape_is_rejected() {
        let err = build_err(
            r#"
            [[entity]]
            kind = "model"
            name = "gemini"
            callbacks = { before_model = 3 }
            "#,
        );
        assert!(matches!(err, DispatchError::Declaration { .. }));

        let err = build_err(
            r#"
            [[entity]]
            kind = "model"
            name = "gemini"
            callbacks = { after_model = ["audit", true] }
            "#,
        );
        assert!(err.to_string().contains("list entries must be handler names"));
    }

    #[test]
    fn hook_point_of_another_kind_is_rejected() {
        let err = build_err(
            r#"
            [[entity]]
            kind = "agent"
            name = "root"
            callbacks = { before_tool = "audit" }
            "#,
        );
        assert!(err.to_string().contains("not exposed by agent entities"));
    }

    #[test]
    fn unknown_hook_point_is_rejected() {
        let err = build_err(
            r#"
            [[entity]]
            kind = "agent"
            name = "root"
            callbacks = { on_error = "audit" }
            "#,
        );
        assert!(err.to_string().contains("unknown hook point 'on_error'"));
    }

    #[test]
    fn duplicate_entity_is_rejected() {
        let err = build_err(
            r#"
            [[entity]]
            kind = "agent"
            name = "root"

            [[entity]]
            kind = "agent"
            name = "root"
            "#,
        );
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn chain_cap_comes_from_config() {
        let config = CallbackConfig {
            max_chain_len: 1,
            ..CallbackConfig::default()
        };
        let err = Manifest::from_toml_str(MANIFEST)
            .unwrap()
            .build(&catalog(), &config)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Declaration { .. }));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Manifest::from_toml_str("[[entity]]\nkind = \"robot\"\nname = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("callbacks.toml");
        std::fs::write(&path, MANIFEST).unwrap();

        let config = CallbackConfig {
            manifest_path: Some(path),
            ..CallbackConfig::default()
        };
        let manifest = Manifest::from_config(&config).unwrap().unwrap();
        assert_eq!(manifest.entities.len(), 2);

        let missing = Manifest::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
