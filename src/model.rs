//! Static schema describing entities and their attributes.
//!
//! A [`Model`] is built once (from configuration or with
//! [`crate::builders::ModelBuilder`]) and never mutated afterwards. Lookups by
//! attribute id and by `(entity name, attribute name)` go through indices that
//! are computed in [`Model::new`].

use crate::entity::{EntityData, FieldValue};
use crate::error::{ComponentError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A typed attribute of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAttribute {
    /// Stable opaque id, unique within the model
    pub id: String,

    /// Display name, unique within the owning entity
    pub name: String,

    /// Id of the owning entity (filled in by [`Model::new`])
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entity_id: String,

    /// Optional type label (e.g. VARCHAR, INTEGER)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl ModelAttribute {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity_id: String::new(),
            data_type: None,
        }
    }
}

/// Named grouping of attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<ModelAttribute>,
}

impl ModelEntity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute_by_name(&self, name: &str) -> Option<&ModelAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Serialized shape of a model, validated into a [`Model`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub entities: Vec<ModelEntity>,
}

/// Ordered set of entities with id and name indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelDef", into = "ModelDef")]
pub struct Model {
    id: String,
    name: String,
    entities: Vec<ModelEntity>,

    /// attribute id -> (entity index, attribute index)
    by_id: HashMap<String, (usize, usize)>,

    /// entity name -> (entity index, attribute name -> attribute index)
    by_name: HashMap<String, (usize, HashMap<String, usize>)>,
}

impl Model {
    /// Build a model and its lookup indices.
    ///
    /// # Errors
    /// Returns `ComponentError::Configuration` if an attribute id is repeated
    /// anywhere in the model, an entity name is repeated, or an attribute name
    /// is repeated within one entity.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mut entities: Vec<ModelEntity>,
    ) -> Result<Self> {
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();

        for (entity_idx, entity) in entities.iter_mut().enumerate() {
            let mut names = HashMap::new();

            for (attr_idx, attribute) in entity.attributes.iter_mut().enumerate() {
                attribute.entity_id = entity.id.clone();

                if by_id.insert(attribute.id.clone(), (entity_idx, attr_idx)).is_some() {
                    return Err(ComponentError::configuration(format!(
                        "Duplicate attribute id '{}' in model",
                        attribute.id
                    )));
                }

                if names.insert(attribute.name.clone(), attr_idx).is_some() {
                    return Err(ComponentError::configuration(format!(
                        "Duplicate attribute name '{}' in entity '{}'",
                        attribute.name, entity.name
                    )));
                }
            }

            if by_name.insert(entity.name.clone(), (entity_idx, names)).is_some() {
                return Err(ComponentError::configuration(format!(
                    "Duplicate entity name '{}' in model",
                    entity.name
                )));
            }
        }

        Ok(Self {
            id: id.into(),
            name: name.into(),
            entities,
            by_id,
            by_name,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entities(&self) -> &[ModelEntity] {
        &self.entities
    }

    pub fn attribute_count(&self) -> usize {
        self.by_id.len()
    }

    /// Look up an attribute by its id.
    pub fn attribute_by_id(&self, id: &str) -> Option<&ModelAttribute> {
        self.by_id
            .get(id)
            .map(|&(e, a)| &self.entities[e].attributes[a])
    }

    /// Look up an attribute by entity name and attribute name.
    pub fn attribute_by_name(&self, entity_name: &str, attribute_name: &str) -> Result<&ModelAttribute> {
        let (entity_idx, names) = self.by_name.get(entity_name).ok_or_else(|| {
            ComponentError::not_found(format!(
                "Entity '{}' is not defined in model '{}'",
                entity_name, self.name
            ))
        })?;

        let attr_idx = names.get(attribute_name).ok_or_else(|| {
            ComponentError::not_found(format!(
                "Attribute '{}.{}' is not defined in model '{}'",
                entity_name, attribute_name, self.name
            ))
        })?;

        Ok(&self.entities[*entity_idx].attributes[*attr_idx])
    }

    pub fn entity_by_name(&self, name: &str) -> Result<&ModelEntity> {
        self.by_name
            .get(name)
            .map(|(idx, _)| &self.entities[*idx])
            .ok_or_else(|| {
                ComponentError::not_found(format!(
                    "Entity '{}' is not defined in model '{}'",
                    name, self.name
                ))
            })
    }

    pub fn entity_by_id(&self, id: &str) -> Option<&ModelEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Entity owning the given attribute id.
    pub fn entity_of(&self, attribute_id: &str) -> Option<&ModelEntity> {
        self.by_id.get(attribute_id).map(|&(e, _)| &self.entities[e])
    }

    /// Every attribute carrying the display name, across all entities.
    pub fn attributes_named(&self, name: &str) -> Vec<&ModelAttribute> {
        self.entities
            .iter()
            .filter_map(|e| e.attribute_by_name(name))
            .collect()
    }

    /// Names of the entities whose attributes occur in a record.
    pub fn entity_names_for(&self, data: &EntityData) -> BTreeSet<String> {
        data.attribute_ids()
            .filter_map(|id| self.entity_of(id))
            .map(|e| e.name.clone())
            .collect()
    }

    /// Convert a record to a row keyed by attribute name.
    ///
    /// With `qualified` set the keys are `ENTITY.attribute`. Attribute ids the
    /// model does not define are skipped.
    pub fn to_row(&self, data: &EntityData, qualified: bool) -> IndexMap<String, FieldValue> {
        let mut row = IndexMap::new();
        for (id, value) in data.iter() {
            if let Some(&(e, a)) = self.by_id.get(id.as_str()) {
                let entity = &self.entities[e];
                let attribute = &entity.attributes[a];
                let key = if qualified {
                    format!("{}.{}", entity.name, attribute.name)
                } else {
                    attribute.name.clone()
                };
                row.insert(key, value.clone());
            }
        }
        row
    }
}

impl TryFrom<ModelDef> for Model {
    type Error = ComponentError;

    fn try_from(def: ModelDef) -> Result<Self> {
        Model::new(def.id, def.name, def.entities)
    }
}

impl From<Model> for ModelDef {
    fn from(model: Model) -> Self {
        ModelDef {
            id: model.id,
            name: model.name,
            entities: model.entities,
        }
    }
}
