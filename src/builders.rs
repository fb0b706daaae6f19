//! Builders for models, records and messages.
//!
//! Used by configuration code and tests to assemble inputs and expected
//! outputs; they carry no transform logic.

use crate::entity::{EntityData, FieldValue, Payload};
use crate::error::Result;
use crate::message::{Message, MessageBody, MessageHeader};
use crate::model::{Model, ModelAttribute, ModelEntity};
use serde_json::Value;
use uuid::Uuid;

fn generated_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds one entity of a model
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    entity: ModelEntity,
}

impl EntityBuilder {
    fn new(id: String, name: &str) -> Self {
        Self {
            entity: ModelEntity::new(id, name),
        }
    }

    /// Add an attribute with a generated id
    pub fn with_attribute(self, name: &str) -> Self {
        self.with_attribute_id(&generated_id(), name)
    }

    pub fn with_attribute_id(mut self, id: &str, name: &str) -> Self {
        self.entity.attributes.push(ModelAttribute::new(id, name));
        self
    }

    pub fn with_typed_attribute(mut self, id: &str, name: &str, data_type: &str) -> Self {
        let mut attribute = ModelAttribute::new(id, name);
        attribute.data_type = Some(data_type.to_string());
        self.entity.attributes.push(attribute);
        self
    }
}

/// Builds a [`Model`]
///
/// # Example
/// ```
/// use flowmap::builders::ModelBuilder;
///
/// let model = ModelBuilder::new("customers")
///     .with_entity("CUSTOMER", |e| e.with_attribute_id("A1", "id").with_attribute("name"))
///     .build()
///     .unwrap();
///
/// assert_eq!(model.attribute_by_id("A1").unwrap().name, "id");
/// assert!(model.attribute_by_name("CUSTOMER", "name").is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    id: String,
    name: String,
    entities: Vec<ModelEntity>,
}

impl ModelBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            id: generated_id(),
            name: name.to_string(),
            entities: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Add an entity with a generated id
    pub fn with_entity(self, name: &str, build: impl FnOnce(EntityBuilder) -> EntityBuilder) -> Self {
        self.with_entity_id(&generated_id(), name, build)
    }

    pub fn with_entity_id(
        mut self,
        id: &str,
        name: &str,
        build: impl FnOnce(EntityBuilder) -> EntityBuilder,
    ) -> Self {
        let entity = build(EntityBuilder::new(id.to_string(), name)).entity;
        self.entities.push(entity);
        self
    }

    pub fn build(self) -> Result<Model> {
        Model::new(self.id, self.name, self.entities)
    }
}

/// Builds one record
#[derive(Debug, Clone, Default)]
pub struct EntityDataBuilder {
    data: EntityData,
}

impl EntityDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kv(mut self, attribute_id: &str, value: impl Into<FieldValue>) -> Self {
        self.data.put(attribute_id, value);
        self
    }

    pub fn build(self) -> EntityData {
        self.data
    }
}

/// Builds an ordered payload
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    rows: Payload,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(mut self, row: EntityData) -> Self {
        self.rows.push(row);
        self
    }

    pub fn build(self) -> Payload {
        self.rows
    }
}

/// Builds a control or data message
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    header: MessageHeader,
    body: MessageBody,
}

impl MessageBuilder {
    /// Start a control message originating from `step_id`
    pub fn new(step_id: &str) -> Self {
        Self {
            header: MessageHeader {
                originating_step_id: Some(step_id.to_string()),
                ..MessageHeader::default()
            },
            body: MessageBody::Control,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.body = MessageBody::Data(payload);
        self
    }

    pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.header.set(name, value);
        self
    }

    pub fn last_of_unit_of_work(mut self, last: bool) -> Self {
        self.header.last_of_unit_of_work = last;
        self
    }

    pub fn build(self) -> Message {
        Message::with_header(self.header, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_builder_generates_ids() {
        let model = ModelBuilder::new("m")
            .with_entity("A", |e| e.with_attribute("x").with_attribute("y"))
            .with_entity("B", |e| e.with_attribute("x"))
            .build()
            .unwrap();

        assert_eq!(model.entities().len(), 2);
        assert_eq!(model.attribute_count(), 3);
        let ax = model.attribute_by_name("A", "x").unwrap();
        let bx = model.attribute_by_name("B", "x").unwrap();
        assert_ne!(ax.id, bx.id);
    }

    #[test]
    fn test_model_builder_duplicate_name_fails() {
        let result = ModelBuilder::new("m")
            .with_entity("A", |e| e.with_attribute("x").with_attribute("x"))
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_message_builder() {
        let payload = PayloadBuilder::new()
            .add_row(EntityDataBuilder::new().with_kv("A1", "v").build())
            .build();

        let message = MessageBuilder::new("step1")
            .with_payload(payload)
            .with_param("file", "a.csv")
            .last_of_unit_of_work(true)
            .build();

        assert!(message.is_last_of_unit_of_work());
        assert_eq!(message.header().originating_step_id.as_deref(), Some("step1"));
        assert_eq!(message.payload().unwrap()[0].get("A1"), Some(&FieldValue::from("v")));

        let control = MessageBuilder::new("step1").build();
        assert!(control.is_control());
    }
}
