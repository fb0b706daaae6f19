//! Attribute mapping component.
//!
//! Routes every attribute of an incoming record to zero or more attributes of
//! the output model. The routing table is configured per source attribute with
//! the `mapsTo` setting, parsed into an [`UnresolvedMapping`] (target names as
//! written) and resolved once at start into a [`ResolvedMapping`] (target
//! attribute ids of the output model).
//!
//! Attributes without a route are dropped, or written as explicit nulls when
//! `setUnmappedAttributesToNull` is set and the output model defines the same
//! attribute id.

use crate::config::FlowStep;
use crate::entity::{EntityData, FieldValue, Payload};
use crate::error::{ComponentError, Result};
use crate::message::{Message, MessageBody};
use crate::model::Model;
use crate::runtime::callback::SendMessageCallback;
use crate::runtime::component::{ComponentContext, ComponentRuntime};
use crate::runtime::registry::{ComponentDefinition, SettingDefinition, SettingKind};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::sync::Arc;

pub const TYPE: &str = "Mapping";

/// Per-attribute setting naming the target attributes
pub const ATTRIBUTE_MAPS_TO: &str = "mapsTo";

/// Step setting selecting the unmapped-attribute policy
pub const SET_UNMAPPED_ATTRIBUTES_TO_NULL: &str = "setUnmappedAttributesToNull";

/// Source attribute id -> target references, as configured.
///
/// A target reference is an output attribute id, a qualified
/// `ENTITY.attribute` name, or a bare attribute name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnresolvedMapping {
    entries: IndexMap<String, IndexSet<String>>,
}

impl UnresolvedMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the `mapsTo` attribute settings of a flow step.
    pub fn from_step(step: &FlowStep) -> Self {
        Self {
            entries: step.attribute_setting_values(ATTRIBUTE_MAPS_TO),
        }
    }

    pub fn insert(&mut self, source_id: impl Into<String>, target: impl Into<String>) {
        self.entries
            .entry(source_id.into())
            .or_default()
            .insert(target.into());
    }

    pub fn contains_source(&self, source_id: &str) -> bool {
        self.entries.contains_key(source_id)
    }

    pub fn targets(&self, source_id: &str) -> Option<&IndexSet<String>> {
        self.entries.get(source_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexSet<String>)> {
        self.entries.iter()
    }

    /// Bind every target reference to an attribute id of `output_model`.
    ///
    /// # Errors
    /// `ComponentError::Configuration` when a reference matches no attribute,
    /// or when a bare name matches attributes of several entities.
    pub fn resolve(&self, output_model: &Model) -> Result<ResolvedMapping> {
        let mut routes = HashMap::with_capacity(self.entries.len());

        for (source_id, targets) in &self.entries {
            let mut ids: Vec<String> = Vec::with_capacity(targets.len());
            for reference in targets {
                let id = resolve_target(output_model, source_id, reference)?;
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            routes.insert(source_id.clone(), ids);
        }

        Ok(ResolvedMapping { routes })
    }
}

fn resolve_target(model: &Model, source_id: &str, reference: &str) -> Result<String> {
    if let Some(attribute) = model.attribute_by_id(reference) {
        return Ok(attribute.id.clone());
    }

    if let Some((entity, name)) = reference.split_once('.') {
        if let Ok(attribute) = model.attribute_by_name(entity, name) {
            return Ok(attribute.id.clone());
        }
    }

    let candidates = model.attributes_named(reference);
    match candidates.as_slice() {
        [attribute] => Ok(attribute.id.clone()),
        [] => Err(ComponentError::configuration(format!(
            "Mapping target '{}' of attribute '{}' is not defined in output model '{}'",
            reference,
            source_id,
            model.name()
        ))),
        many => {
            let entities: Vec<&str> = many
                .iter()
                .filter_map(|a| model.entity_by_id(&a.entity_id))
                .map(|e| e.name.as_str())
                .collect();
            Err(ComponentError::configuration(format!(
                "Mapping target '{}' of attribute '{}' is ambiguous in output model '{}' (entities: {}); qualify it as ENTITY.{}",
                reference,
                source_id,
                model.name(),
                entities.join(", "),
                reference
            )))
        }
    }
}

/// Source attribute id -> target attribute ids of the output model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedMapping {
    routes: HashMap<String, Vec<String>>,
}

impl ResolvedMapping {
    pub fn targets(&self, source_id: &str) -> Option<&[String]> {
        self.routes.get(source_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// State entered by a successful `start`
#[derive(Debug)]
struct Ready {
    attribute_mappings: UnresolvedMapping,
    resolved: ResolvedMapping,
    set_unmapped_to_null: bool,
    input_model: Arc<Model>,
    output_model: Arc<Model>,
}

impl Ready {
    fn transform_record(&self, record: &EntityData) -> Result<EntityData> {
        let mut out = EntityData::new();

        for (id, value) in record.iter() {
            let known_output = self.output_model.attribute_by_id(id).is_some();
            if !known_output && self.input_model.attribute_by_id(id).is_none() {
                return Err(ComponentError::misconfigured(format!(
                    "Attribute '{}' is not defined in input model '{}' or output model '{}'",
                    id,
                    self.input_model.name(),
                    self.output_model.name()
                )));
            }

            match self.resolved.targets(id) {
                Some(targets) => {
                    for target in targets {
                        out.put(target.clone(), value.clone());
                    }
                }
                // A routed value already written for this id wins over the null fill
                None if self.set_unmapped_to_null && known_output => {
                    if !out.contains_attribute(id) {
                        out.put(id.clone(), FieldValue::Null);
                    }
                }
                None => {}
            }
        }

        Ok(out)
    }
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Ready(Ready),
}

/// The attribute mapping component.
#[derive(Debug)]
pub struct Mapping {
    context: Option<ComponentContext>,
    state: State,
}

impl Default for Mapping {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapping {
    pub fn new() -> Self {
        Self {
            context: None,
            state: State::Uninitialized,
        }
    }

    pub fn definition() -> ComponentDefinition {
        ComponentDefinition::new(TYPE, "PROCESSOR")
            .with_description("Maps attributes of the input model onto attributes of the output model")
            .with_setting(SettingDefinition::step(
                SET_UNMAPPED_ATTRIBUTES_TO_NULL,
                SettingKind::Boolean,
                Some(false.into()),
            ))
            .with_setting(SettingDefinition::attribute(ATTRIBUTE_MAPS_TO, SettingKind::AttributeList))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Routing table as configured, once started.
    pub fn attribute_mappings(&self) -> Option<&UnresolvedMapping> {
        match &self.state {
            State::Ready(ready) => Some(&ready.attribute_mappings),
            State::Uninitialized => None,
        }
    }

    /// Routing table bound to output attribute ids, once started.
    pub fn resolved_mappings(&self) -> Option<&ResolvedMapping> {
        match &self.state {
            State::Ready(ready) => Some(&ready.resolved),
            State::Uninitialized => None,
        }
    }

    pub fn sets_unmapped_attributes_to_null(&self) -> bool {
        matches!(&self.state, State::Ready(ready) if ready.set_unmapped_to_null)
    }
}

impl ComponentRuntime for Mapping {
    fn component_type(&self) -> &str {
        TYPE
    }

    fn start(&mut self, context: ComponentContext) -> Result<()> {
        let (input_model, output_model) = match (context.input_model(), context.output_model()) {
            (Some(input), Some(output)) => (Arc::clone(input), Arc::clone(output)),
            _ => {
                return Err(ComponentError::misconfigured(format!(
                    "The input/output model must be defined for mapping step '{}'",
                    context.flow_step().id
                )))
            }
        };

        let step = context.flow_step();
        let set_unmapped_to_null = step.bool_setting(SET_UNMAPPED_ATTRIBUTES_TO_NULL, false)?;
        let attribute_mappings = UnresolvedMapping::from_step(step);
        let resolved = attribute_mappings.resolve(&output_model)?;

        tracing::info!(
            "Mapping step '{}' ready with {} mapped attributes (unmapped to null: {})",
            step.id,
            resolved.len(),
            set_unmapped_to_null
        );

        self.state = State::Ready(Ready {
            attribute_mappings,
            resolved,
            set_unmapped_to_null,
            input_model,
            output_model,
        });
        self.context = Some(context);
        Ok(())
    }

    fn handle(&mut self, message: &Message, callback: &mut dyn SendMessageCallback) -> Result<()> {
        let (context, ready) = match (self.context.as_mut(), &self.state) {
            (Some(context), State::Ready(ready)) => (context, ready),
            _ => {
                return Err(ComponentError::misconfigured(
                    "Mapping component must be started before it handles messages",
                ))
            }
        };

        context.statistics_mut().inc_received();

        let payload = match message.payload() {
            Some(payload) => payload,
            None => return Ok(()),
        };

        let mut rows = Payload::with_capacity(payload.len());
        for record in payload {
            rows.push(ready.transform_record(record)?);
        }
        context.statistics_mut().inc_entities_processed(rows.len());

        if rows.is_empty() && !message.is_last_of_unit_of_work() {
            tracing::debug!("Step '{}' received an empty payload, nothing to forward", context.flow_step().id);
            return Ok(());
        }

        let mut header = message.header().clone();
        header.originating_step_id = Some(context.flow_step().id.clone());

        tracing::debug!(
            "Step '{}' forwarding {} mapped rows (last of unit of work: {})",
            context.flow_step().id,
            rows.len(),
            header.last_of_unit_of_work
        );

        callback.forward(Message::with_header(header, MessageBody::Data(rows)))?;
        context.statistics_mut().inc_forwarded();
        Ok(())
    }

    fn context(&self) -> Option<&ComponentContext> {
        self.context.as_ref()
    }
}
