//! Process-wide plugin registry.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::callbacks::entity::PluginHandler;
use crate::callbacks::hook_point::HookPoint;
use crate::error::DispatchError;

/// Holds at most one plugin handler per hook point.
///
/// Plugins are consulted before any entity callback for the same hook point.
pub struct PluginRegistry {
    plugins: RwLock<HashMap<HookPoint, PluginHandler>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
        }
    }

    /// Register `plugin` at `point`.
    ///
    /// Fails with [`DispatchError::PluginConflict`] if a plugin is already
    /// registered there.
    pub async fn register(
        &self,
        point: HookPoint,
        plugin: PluginHandler,
    ) -> Result<(), DispatchError> {
        let mut plugins = self.plugins.write().await;
        if let Some(existing) = plugins.get(&point) {
            return Err(DispatchError::PluginConflict {
                point,
                existing: existing.name().to_string(),
            });
        }
        tracing::debug!(point = %point, plugin = plugin.name(), "Registered plugin");
        plugins.insert(point, plugin);
        Ok(())
    }

    /// Register `plugin` at every point in `points`.
    ///
    /// All-or-nothing: on conflict nothing is registered.
    pub async fn register_all(
        &self,
        points: impl IntoIterator<Item = HookPoint>,
        plugin: PluginHandler,
    ) -> Result<(), DispatchError> {
        let points: Vec<HookPoint> = points.into_iter().collect();
        let mut plugins = self.plugins.write().await;
        if let Some((point, existing)) = points
            .iter()
            .find_map(|p| plugins.get(p).map(|existing| (*p, existing)))
        {
            return Err(DispatchError::PluginConflict {
                point,
                existing: existing.name().to_string(),
            });
        }
        for point in points {
            plugins.insert(point, plugin.clone());
        }
        Ok(())
    }

    /// Register `plugin` at `point`, returning the plugin it displaced.
    pub async fn replace(&self, point: HookPoint, plugin: PluginHandler) -> Option<PluginHandler> {
        let previous = self.plugins.write().await.insert(point, plugin);
        if let Some(ref previous) = previous {
            tracing::debug!(point = %point, replaced = previous.name(), "Replaced plugin");
        }
        previous
    }

    /// Remove the plugin at `point`, returning it if one was registered.
    pub async fn unregister(&self, point: HookPoint) -> Option<PluginHandler> {
        self.plugins.write().await.remove(&point)
    }

    /// The plugin registered at `point`.
    ///
    /// The handle is cloned out so the lock is released before the plugin
    /// runs; a slow plugin never blocks registration or other dispatches.
    pub async fn get(&self, point: HookPoint) -> Option<PluginHandler> {
        self.plugins.read().await.get(&point).cloned()
    }

    /// Registered `(hook point, plugin name)` pairs in hook point order.
    pub async fn list(&self) -> Vec<(HookPoint, String)> {
        let plugins = self.plugins.read().await;
        HookPoint::ALL
            .iter()
            .filter_map(|p| plugins.get(p).map(|h| (*p, h.name().to_string())))
            .collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::callbacks::context::CallContext;
    use crate::callbacks::handler::{EntityRef, plugin_from_fn};

    fn named(name: &str) -> PluginHandler {
        plugin_from_fn::<CallContext, Value, _>(name.to_string(), |_, _| Ok(None))
    }

    #[tokio::test]
    async fn empty_registry_has_no_plugins() {
        let registry = PluginRegistry::new();
        assert!(registry.get(HookPoint::BEFORE_MODEL).await.is_none());
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn register_and_list() {
        let registry = PluginRegistry::new();
        registry
            .register(HookPoint::AFTER_TOOL, named("after"))
            .await
            .unwrap();
        registry
            .register(HookPoint::BEFORE_AGENT, named("before"))
            .await
            .unwrap();

        let listed = registry.list().await;
        assert_eq!(
            listed,
            vec![
                (HookPoint::BEFORE_AGENT, "before".to_string()),
                (HookPoint::AFTER_TOOL, "after".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn second_plugin_on_same_point_conflicts() {
        let registry = PluginRegistry::new();
        registry
            .register(HookPoint::BEFORE_MODEL, named("first"))
            .await
            .unwrap();
        let err = registry
            .register(HookPoint::BEFORE_MODEL, named("second"))
            .await
            .unwrap_err();
        match err {
            DispatchError::PluginConflict { existing, .. } => assert_eq!(existing, "first"),
            other => panic!("Expected PluginConflict, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn register_all_is_atomic() {
        let registry = PluginRegistry::new();
        registry
            .register(HookPoint::AFTER_MODEL, named("taken"))
            .await
            .unwrap();

        let result = registry
            .register_all(
                [HookPoint::BEFORE_MODEL, HookPoint::AFTER_MODEL],
                named("audit"),
            )
            .await;
        assert!(result.is_err());
        assert!(registry.get(HookPoint::BEFORE_MODEL).await.is_none());
    }

    #[tokio::test]
    async fn replace_and_unregister() {
        let registry = PluginRegistry::new();
        assert!(
            registry
                .replace(HookPoint::BEFORE_TOOL, named("one"))
                .await
                .is_none()
        );
        let old = registry
            .replace(HookPoint::BEFORE_TOOL, named("two"))
            .await
            .unwrap();
        assert_eq!(old.name(), "one");

        let removed = registry.unregister(HookPoint::BEFORE_TOOL).await.unwrap();
        assert_eq!(removed.name(), "two");
        assert!(registry.unregister(HookPoint::BEFORE_TOOL).await.is_none());
    }

    #[tokio::test]
    async fn get_returns_shared_handle() {
        let registry = PluginRegistry::new();
        let plugin = plugin_from_fn::<CallContext, Value, _>("answer", |_, _| Ok(Some(json!(1))));
        registry
            .register(HookPoint::AFTER_AGENT, Arc::clone(&plugin))
            .await
            .unwrap();

        let fetched = registry.get(HookPoint::AFTER_AGENT).await.unwrap();
        assert!(Arc::ptr_eq(&fetched, &plugin));
        let entity = EntityRef::new(crate::callbacks::hook_point::EntityKind::Agent, "root");
        let ctx = CallContext::agent("root", "inv-1");
        assert_eq!(fetched.call(&entity, &ctx).await.unwrap(), Some(json!(1)));
    }
}
