//! Tracked topic entities.
//!
//! The orchestrator tracks a current-topic entity across turns (produced by
//! entity-linking collaborators outside this core). Components match the
//! entity's category against their nodes' trigger categories when deciding
//! whether to start a topic.

use serde::{Deserialize, Serialize};

/// Category of a linked entity (e.g. "musician", "city", "film").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityCategory(String);

impl EntityCategory {
    pub fn new(category: impl Into<String>) -> Self {
        Self(category.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityCategory {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A topic entity, as linked by NLU collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Surface form of the entity, as it appeared or should be spoken.
    pub text: String,
    /// Category the entity was linked to, if any.
    pub category: Option<EntityCategory>,
}

impl Entity {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<EntityCategory>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Check whether this entity belongs to one of the given categories.
    pub fn in_categories(&self, categories: &[EntityCategory]) -> bool {
        match &self.category {
            Some(c) => categories.contains(c),
            None => false,
        }
    }
}

impl From<String> for EntityCategory {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_category_match() {
        let entity = Entity::new("David Bowie").with_category("musician");
        let categories = vec![EntityCategory::from("musician"), EntityCategory::from("band")];
        assert!(entity.in_categories(&categories));
        assert!(!entity.in_categories(&[EntityCategory::from("city")]));
    }

    #[test]
    fn test_uncategorized_entity_matches_nothing() {
        let entity = Entity::new("something");
        assert!(!entity.in_categories(&[EntityCategory::from("city")]));
    }
}
