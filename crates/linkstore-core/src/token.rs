//! Token name lookup for diagnostics
//!
//! Label, relationship type and property key names live in an external token
//! store. This crate only needs them to make log lines readable, so lookups
//! fall back to the numeric id.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Resolves numeric token ids to display names
pub trait TokenNameLookup: Send + Sync {
    /// Property key name
    fn property_key_name(&self, id: u32) -> Option<String>;

    /// Relationship type name
    fn relationship_type_name(&self, id: u32) -> Option<String>;

    /// Label name
    fn label_name(&self, id: u32) -> Option<String>;

    /// Property key name, or `key#<id>` when unknown
    fn property_key_display(&self, id: u32) -> String {
        self.property_key_name(id)
            .unwrap_or_else(|| format!("key#{id}"))
    }

    /// Relationship type name, or `type#<id>` when unknown
    fn relationship_type_display(&self, id: u32) -> String {
        self.relationship_type_name(id)
            .unwrap_or_else(|| format!("type#{id}"))
    }
}

/// In-memory token registry
#[derive(Debug, Default)]
pub struct TokenRegistry {
    property_keys: RwLock<HashMap<u32, String>>,
    relationship_types: RwLock<HashMap<u32, String>>,
    labels: RwLock<HashMap<u32, String>>,
}

impl TokenRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a property key name
    pub fn register_property_key(&self, id: u32, name: impl Into<String>) {
        self.property_keys.write().insert(id, name.into());
    }

    /// Register a relationship type name
    pub fn register_relationship_type(&self, id: u32, name: impl Into<String>) {
        self.relationship_types.write().insert(id, name.into());
    }

    /// Register a label name
    pub fn register_label(&self, id: u32, name: impl Into<String>) {
        self.labels.write().insert(id, name.into());
    }
}

impl TokenNameLookup for TokenRegistry {
    fn property_key_name(&self, id: u32) -> Option<String> {
        self.property_keys.read().get(&id).cloned()
    }

    fn relationship_type_name(&self, id: u32) -> Option<String> {
        self.relationship_types.read().get(&id).cloned()
    }

    fn label_name(&self, id: u32) -> Option<String> {
        self.labels.read().get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_names_and_fallbacks() {
        let tokens = TokenRegistry::new();
        tokens.register_property_key(1, "name");
        tokens.register_relationship_type(2, "KNOWS");
        tokens.register_label(3, "Person");

        assert_eq!(tokens.property_key_display(1), "name");
        assert_eq!(tokens.property_key_display(9), "key#9");
        assert_eq!(tokens.relationship_type_display(2), "KNOWS");
        assert_eq!(tokens.relationship_type_display(4), "type#4");
        assert_eq!(tokens.label_name(3).as_deref(), Some("Person"));
        assert_eq!(tokens.label_name(4), None);
    }
}
