//! Component factory for creating flow components by type name.
//!
//! The flow runtime looks components up by the `component` field of a step
//! and asks the factory for a fresh instance per step and thread.

use crate::error::{ComponentError, Result};
use crate::runtime::component::ComponentRuntime;
use crate::runtime::mapping::Mapping;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Value kind a setting accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    Boolean,
    /// Comma-separated string or list of attribute references
    AttributeList,
}

/// A setting a component reads from its flow step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingDefinition {
    pub name: String,
    pub kind: SettingKind,
    #[serde(default)]
    pub default: Option<Value>,
    /// Set per attribute rather than per step
    #[serde(default)]
    pub per_attribute: bool,
}

impl SettingDefinition {
    pub fn step(name: &str, kind: SettingKind, default: Option<Value>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default,
            per_attribute: false,
        }
    }

    pub fn attribute(name: &str, kind: SettingKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: None,
            per_attribute: true,
        }
    }
}

/// Describes a component type and the settings it understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub type_name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub settings: Vec<SettingDefinition>,
}

impl ComponentDefinition {
    pub fn new(type_name: &str, category: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            category: category.to_string(),
            description: None,
            settings: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_setting(mut self, setting: SettingDefinition) -> Self {
        self.settings.push(setting);
        self
    }

    pub fn setting(&self, name: &str) -> Option<&SettingDefinition> {
        self.settings.iter().find(|s| s.name == name)
    }
}

/// Constructor for a fresh component instance
pub type ComponentConstructor = Box<dyn Fn() -> Box<dyn ComponentRuntime> + Send + Sync>;

struct Registration {
    constructor: ComponentConstructor,
    definition: ComponentDefinition,
}

/// Registry of component types
pub struct ComponentFactory {
    components: HashMap<String, Registration>,
}

impl ComponentFactory {
    /// Create an empty factory
    pub fn new() -> Self {
        Self {
            components: HashMap::new(),
        }
    }

    /// Register a component type
    ///
    /// # Example
    ///
    /// ```
    /// use flowmap::runtime::{ComponentDefinition, ComponentFactory, Mapping};
    ///
    /// let mut factory = ComponentFactory::new();
    /// factory.register(ComponentDefinition::new("Mapping", "PROCESSOR"), Mapping::new);
    /// assert!(factory.has_component("Mapping"));
    /// ```
    pub fn register<F, C>(&mut self, definition: ComponentDefinition, constructor: F)
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: ComponentRuntime + 'static,
    {
        let constructor: ComponentConstructor =
            Box::new(move || Box::new(constructor()) as Box<dyn ComponentRuntime>);

        self.components.insert(
            definition.type_name.clone(),
            Registration {
                constructor,
                definition,
            },
        );
    }

    /// Create a new, unstarted instance of a component type
    ///
    /// # Errors
    ///
    /// `ComponentError::NotFound` if the type is not registered
    pub fn create(&self, type_name: &str) -> Result<Box<dyn ComponentRuntime>> {
        let registration = self.components.get(type_name).ok_or_else(|| {
            ComponentError::not_found(format!("Component type '{}' is not registered", type_name))
        })?;

        Ok((registration.constructor)())
    }

    /// Check if a component type is registered
    pub fn has_component(&self, type_name: &str) -> bool {
        self.components.contains_key(type_name)
    }

    /// Registered types grouped by category, sorted
    pub fn component_types(&self) -> BTreeMap<String, Vec<String>> {
        let mut types: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for registration in self.components.values() {
            types
                .entry(registration.definition.category.clone())
                .or_default()
                .push(registration.definition.type_name.clone());
        }
        for names in types.values_mut() {
            names.sort();
        }
        types
    }

    pub fn component_definition(&self, type_name: &str) -> Option<&ComponentDefinition> {
        self.components.get(type_name).map(|r| &r.definition)
    }
}

impl Default for ComponentFactory {
    /// Factory with the built-in components registered
    fn default() -> Self {
        let mut factory = Self::new();
        factory.register(Mapping::definition(), Mapping::new);
        factory
    }
}
