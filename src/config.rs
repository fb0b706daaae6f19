//! Flow step configuration loader.
//!
//! Loads a flow step (component type, settings, per-attribute settings and the
//! input/output models) from YAML and exposes the parsed mapping settings the
//! Mapping component starts from.

use crate::error::{ComponentError, Result};
use crate::model::Model;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Setting value attached to a single attribute: a CSV string or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    List(Vec<String>),
    Single(String),
}

impl SettingValue {
    /// Split into individual trimmed, non-empty values.
    pub fn values(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            SettingValue::Single(s) => s.split(',').collect(),
            SettingValue::List(items) => items.iter().map(String::as_str).collect(),
        };

        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Per-attribute setting, e.g. `mapsTo` for the Mapping component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSetting {
    pub attribute_id: String,
    pub name: String,
    pub value: SettingValue,
}

/// Configuration of one step in a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStep {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Component type created for this step (e.g. "Mapping")
    pub component: String,

    #[serde(default)]
    pub settings: HashMap<String, JsonValue>,

    #[serde(default)]
    pub attribute_settings: Vec<AttributeSetting>,
}

impl FlowStep {
    pub fn new(id: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            component: component.into(),
            settings: HashMap::new(),
            attribute_settings: Vec::new(),
        }
    }

    pub fn with_setting(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    pub fn with_attribute_setting(
        mut self,
        attribute_id: impl Into<String>,
        name: impl Into<String>,
        value: SettingValue,
    ) -> Self {
        self.attribute_settings.push(AttributeSetting {
            attribute_id: attribute_id.into(),
            name: name.into(),
            value,
        });
        self
    }

    /// Read a boolean step setting.
    ///
    /// Accepts JSON booleans and the strings "true"/"false" (case-insensitive).
    pub fn bool_setting(&self, name: &str, default: bool) -> Result<bool> {
        match self.settings.get(name) {
            None | Some(JsonValue::Null) => Ok(default),
            Some(JsonValue::Bool(b)) => Ok(*b),
            Some(JsonValue::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(ComponentError::configuration(format!(
                    "Setting '{}' of step '{}' must be a boolean, got '{}'",
                    name, self.id, s
                ))),
            },
            Some(other) => Err(ComponentError::configuration(format!(
                "Setting '{}' of step '{}' must be a boolean, got {}",
                name, self.id, other
            ))),
        }
    }

    /// Collect per-attribute setting values with the given name.
    ///
    /// Returns attribute id -> ordered, de-duplicated values. Several entries
    /// for the same attribute are unioned.
    pub fn attribute_setting_values(&self, name: &str) -> IndexMap<String, IndexSet<String>> {
        let mut out: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for setting in self.attribute_settings.iter().filter(|s| s.name == name) {
            out.entry(setting.attribute_id.clone())
                .or_default()
                .extend(setting.value.values());
        }
        out
    }
}

/// A flow step together with the models it reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStepConfig {
    #[serde(flatten)]
    pub step: FlowStep,

    #[serde(default)]
    pub input_model: Option<Model>,

    #[serde(default)]
    pub output_model: Option<Model>,
}

impl FlowStepConfig {
    /// Load a flow step configuration from a YAML file.
    ///
    /// # Example
    /// ```ignore
    /// use flowmap::config::FlowStepConfig;
    ///
    /// let config = FlowStepConfig::load_from_file("config/flows/customer_mapping.yaml")?;
    /// println!("Component: {}", config.step.component);
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|e| {
            ComponentError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_setting_value_csv() {
        let value = SettingValue::Single(" mapping1, mapping2 ,,".to_string());
        assert_eq!(value.values(), vec!["mapping1", "mapping2"]);
    }

    #[test]
    fn test_setting_value_list() {
        let value = SettingValue::List(vec!["a".to_string(), " ".to_string(), "b ".to_string()]);
        assert_eq!(value.values(), vec!["a", "b"]);
    }

    #[test]
    fn test_bool_setting() {
        let step = FlowStep::new("s1", "Mapping")
            .with_setting("flag", true)
            .with_setting("text", "FALSE")
            .with_setting("bad", "maybe")
            .with_setting("number", 1);

        assert!(step.bool_setting("flag", false).unwrap());
        assert!(!step.bool_setting("text", true).unwrap());
        assert!(step.bool_setting("missing", true).unwrap());
        assert!(matches!(step.bool_setting("bad", false), Err(ComponentError::Configuration(_))));
        assert!(matches!(step.bool_setting("number", false), Err(ComponentError::Configuration(_))));
    }

    #[test]
    fn test_attribute_setting_values_union() {
        let step = FlowStep::new("s1", "Mapping")
            .with_attribute_setting("A1", "mapsTo", SettingValue::Single("x, y".to_string()))
            .with_attribute_setting("A1", "mapsTo", SettingValue::List(vec!["y".to_string(), "z".to_string()]))
            .with_attribute_setting("A2", "other", SettingValue::Single("ignored".to_string()));

        let values = step.attribute_setting_values("mapsTo");
        assert_eq!(values.len(), 1);
        let targets: Vec<&String> = values["A1"].iter().collect();
        assert_eq!(targets, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
id: step-1
name: map customers
component: Mapping
settings:
  setUnmappedAttributesToNull: true
attribute_settings:
  - attribute_id: A1
    name: mapsTo
    value: "full_name, display"
  - attribute_id: A2
    name: mapsTo
    value: [CUSTOMER_OUT.city]
input_model:
  id: M1
  name: in
  entities:
    - id: E1
      name: CUSTOMER
      attributes:
        - { id: A1, name: name }
        - { id: A2, name: city }
"#;
        let config = FlowStepConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.step.id, "step-1");
        assert_eq!(config.step.component, "Mapping");
        assert_eq!(config.step.settings.get("setUnmappedAttributesToNull"), Some(&json!(true)));
        assert_eq!(config.step.attribute_settings.len(), 2);
        assert!(config.input_model.is_some());
        assert!(config.output_model.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = FlowStepConfig::load_from_file("/nonexistent/step.yaml");
        assert!(matches!(result, Err(ComponentError::Configuration(_))));
    }
}
