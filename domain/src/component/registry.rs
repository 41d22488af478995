//! Component registration table
//!
//! Explicit name → implementation table built at startup. Registration order
//! is preserved and is the order components are polled each turn.

use super::DialogueComponent;
use crate::core::{ArbitrationError, ComponentName};
use crate::priority::TieBreak;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Default, Clone)]
pub struct ComponentRegistry {
    order: Vec<Arc<dyn DialogueComponent>>,
    index: BTreeMap<ComponentName, usize>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, component: Arc<dyn DialogueComponent>) {
        let name = component.name().clone();
        if let Some(&slot) = self.index.get(&name) {
            warn!(component = %name, "replacing already-registered component");
            self.order[slot] = component;
            return;
        }
        self.index.insert(name, self.order.len());
        self.order.push(component);
    }

    pub fn with(mut self, component: Arc<dyn DialogueComponent>) -> Self {
        self.register(component);
        self
    }

    pub fn get(
        &self,
        name: &ComponentName,
    ) -> Result<&Arc<dyn DialogueComponent>, ArbitrationError> {
        self.index
            .get(name)
            .map(|&slot| &self.order[slot])
            .ok_or_else(|| ArbitrationError::UnknownComponent(name.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DialogueComponent>> {
        self.order.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &ComponentName> {
        self.order.iter().map(|c| c.name())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The fixed tie-break of every registered component, as response ranking
    /// consumes it.
    pub fn tie_breaks(&self) -> BTreeMap<ComponentName, TieBreak> {
        self.order
            .iter()
            .map(|c| (c.name().clone(), c.config().tie_break))
            .collect()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentConfig;
    use crate::node::NodeRegistry;

    struct Stub {
        name: ComponentName,
        config: ComponentConfig,
        nodes: NodeRegistry,
    }

    impl Stub {
        fn arc(name: &str, tie_break: i32) -> Arc<dyn DialogueComponent> {
            Arc::new(Stub {
                name: ComponentName::from(name),
                config: ComponentConfig::new(TieBreak::new(tie_break)),
                nodes: NodeRegistry::new(),
            })
        }
    }

    impl DialogueComponent for Stub {
        fn name(&self) -> &ComponentName {
            &self.name
        }

        fn config(&self) -> &ComponentConfig {
            &self.config
        }

        fn nodes(&self) -> &NodeRegistry {
            &self.nodes
        }
    }

    #[test]
    fn test_registration_and_lookup() {
        let registry = ComponentRegistry::new()
            .with(Stub::arc("persona", 9))
            .with(Stub::arc("news", 4));

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&ComponentName::from("news")).is_ok());
        assert!(matches!(
            registry.get(&ComponentName::from("ghost")),
            Err(ArbitrationError::UnknownComponent(_))
        ));

        let tie_breaks = registry.tie_breaks();
        assert_eq!(
            tie_breaks.get(&ComponentName::from("persona")),
            Some(&TieBreak::new(9))
        );
    }

    #[test]
    fn test_iteration_order_is_registration_order() {
        let registry = ComponentRegistry::new()
            .with(Stub::arc("zeta", 1))
            .with(Stub::arc("alpha", 2));
        let names: Vec<&str> = registry.names().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
