//! Extension surface for user code hooked into a component's lifecycle.
//!
//! User code implements [`ScriptHooks`] (or is a plain closure handling each
//! message) and is hosted by a [`ScriptComponent`]. Every hook receives the
//! instance's [`ScriptHelper`], which holds the current input message, a
//! single-pass cursor over its payload, attribute helpers resolved against the
//! input model, logging and resource access. Hooks that may emit messages get a
//! [`ScriptScope`], which pairs the helper with the callback borrowed for the
//! current invocation.

use crate::entity::{EntityData, FieldValue};
use crate::error::{ComponentError, Result};
use crate::message::{HeaderParams, Message};
use crate::runtime::callback::SendMessageCallback;
use crate::runtime::component::{ComponentContext, ComponentRuntime};
use crate::runtime::resource::{DataSource, Directory};
use crate::runtime::tracker::LogLevel;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;

pub const TYPE: &str = "Script";

/// Per-instance state visible to user scripts.
#[derive(Debug)]
pub struct ScriptHelper {
    context: ComponentContext,
    input_message: Option<Message>,

    /// Position in the current payload; created on first read, cleared when
    /// a new input message is set
    cursor: Option<usize>,

    unit_of_work_boundary_reached: bool,
    script_context: HashMap<String, Value>,
}

impl ScriptHelper {
    pub fn new(context: ComponentContext) -> Self {
        Self {
            context,
            input_message: None,
            cursor: None,
            unit_of_work_boundary_reached: false,
            script_context: HashMap::new(),
        }
    }

    pub fn context(&self) -> &ComponentContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ComponentContext {
        &mut self.context
    }

    /// Replace the current input message and reset the payload cursor.
    pub fn set_input_message(&mut self, message: Message) {
        self.input_message = Some(message);
        self.cursor = None;
    }

    pub fn input_message(&self) -> Option<&Message> {
        self.input_message.as_ref()
    }

    pub fn input_message_mut(&mut self) -> Option<&mut Message> {
        self.input_message.as_mut()
    }

    pub fn unit_of_work_boundary_reached(&self) -> bool {
        self.unit_of_work_boundary_reached
    }

    pub fn set_unit_of_work_boundary_reached(&mut self, reached: bool) {
        self.unit_of_work_boundary_reached = reached;
    }

    /// State user code keeps between invocations.
    pub fn script_context(&self) -> &HashMap<String, Value> {
        &self.script_context
    }

    pub fn script_context_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.script_context
    }

    /// Next record of the current payload, or `None` once exhausted.
    ///
    /// The cursor is shared by all calls for one input message, so a second
    /// pass over the same message yields nothing.
    pub fn next_entity_data(&mut self) -> Result<Option<&EntityData>> {
        self.context.require_input_model()?;

        let payload = match self.input_message.as_ref().and_then(Message::payload) {
            Some(payload) => payload,
            None => return Ok(None),
        };

        let cursor = self.cursor.get_or_insert(0);
        let row = payload.get(*cursor);
        if row.is_some() {
            *cursor += 1;
        }
        Ok(row)
    }

    /// Next record as a row keyed by attribute name.
    pub fn next_row(&mut self) -> Result<Option<IndexMap<String, FieldValue>>> {
        self.next_row_keyed(false)
    }

    /// Next record as a row keyed by `ENTITY.attribute`, for records that
    /// span entities sharing attribute names.
    pub fn next_qualified_row(&mut self) -> Result<Option<IndexMap<String, FieldValue>>> {
        self.next_row_keyed(true)
    }

    fn next_row_keyed(&mut self, qualified: bool) -> Result<Option<IndexMap<String, FieldValue>>> {
        let model = Arc::clone(self.context.require_input_model()?);
        Ok(self.next_entity_data()?.map(|data| model.to_row(data, qualified)))
    }

    pub fn contains_entity(&self, entity_name: &str, data: &EntityData) -> Result<bool> {
        let model = self.context.require_input_model()?;
        Ok(model.entity_names_for(data).contains(entity_name))
    }

    pub fn put_attribute_value(
        &self,
        entity_name: &str,
        attribute_name: &str,
        data: &mut EntityData,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        let model = self.context.require_input_model()?;
        let attribute = model.attribute_by_name(entity_name, attribute_name)?;
        data.put(attribute.id.clone(), value);
        Ok(())
    }

    pub fn attribute_value<'d>(
        &self,
        entity_name: &str,
        attribute_name: &str,
        data: &'d EntityData,
    ) -> Result<Option<&'d FieldValue>> {
        let model = self.context.require_input_model()?;
        let attribute = model.attribute_by_name(entity_name, attribute_name)?;
        Ok(data.get(&attribute.id))
    }

    pub fn attribute_value_by_id<'d>(&self, attribute_id: &str, data: &'d EntityData) -> Result<Option<&'d FieldValue>> {
        let model = self.context.require_input_model()?;
        if model.attribute_by_id(attribute_id).is_none() {
            return Err(ComponentError::not_found(format!(
                "Attribute id '{}' is not defined in model '{}'",
                attribute_id,
                model.name()
            )));
        }
        Ok(data.get(attribute_id))
    }

    /// Value of the attribute in the first row of the current payload that has it.
    pub fn first_attribute_value(&self, entity_name: &str, attribute_name: &str) -> Result<Option<FieldValue>> {
        Ok(self
            .attribute_values(entity_name, attribute_name)?
            .into_iter()
            .next())
    }

    /// Values of the attribute across the current payload, in row order.
    pub fn attribute_values(&self, entity_name: &str, attribute_name: &str) -> Result<Vec<FieldValue>> {
        let model = self.context.require_input_model()?;
        let attribute = model.attribute_by_name(entity_name, attribute_name)?;

        let payload = match self.input_message.as_ref().and_then(Message::payload) {
            Some(payload) => payload,
            None => return Ok(Vec::new()),
        };

        Ok(payload
            .iter()
            .filter_map(|row| row.get(&attribute.id).cloned())
            .collect())
    }

    pub fn info(&self, message: &str) {
        self.context.log(LogLevel::Info, message);
    }

    pub fn error(&self, message: &str) {
        self.context.log(LogLevel::Error, message);
    }

    pub fn data_source(&self) -> Result<Arc<dyn DataSource>> {
        let resource = self.context.resource().ok_or_else(|| {
            ComponentError::misconfigured("In order to run SQL, a data source resource must be defined")
        })?;

        resource
            .as_data_source()
            .ok_or_else(|| ComponentError::misconfigured("A data source resource is required"))
    }

    pub fn directory(&self) -> Result<Arc<dyn Directory>> {
        let resource = self.context.resource().ok_or_else(|| {
            ComponentError::misconfigured("In order to access a directory you must configure a directory resource")
        })?;

        resource
            .as_directory()
            .ok_or_else(|| ComponentError::misconfigured("A directory resource is required"))
    }

    /// Copy a local file into the directory resource, returning bytes copied.
    pub fn copy_file_to_directory(&self, local_path: impl AsRef<Path>, file_name: &str) -> Result<u64> {
        let directory = self.directory()?;
        let mut input = File::open(local_path.as_ref())?;
        let mut output = directory.write(file_name.trim_start_matches('/'), false)?;
        let copied = io::copy(&mut input, &mut output)?;
        output.flush()?;
        Ok(copied)
    }
}

/// The helper plus the callback borrowed for one hook invocation.
pub struct ScriptScope<'a> {
    helper: &'a mut ScriptHelper,
    callback: &'a mut dyn SendMessageCallback,
}

impl<'a> ScriptScope<'a> {
    pub fn new(helper: &'a mut ScriptHelper, callback: &'a mut dyn SendMessageCallback) -> Self {
        Self { helper, callback }
    }

    fn current_input(&self) -> Result<&Message> {
        self.helper
            .input_message
            .as_ref()
            .ok_or_else(|| ComponentError::misconfigured("There is no input message to forward"))
    }

    fn sent(&mut self) {
        self.helper.context.statistics_mut().inc_forwarded();
    }

    /// Forward any message built by user code.
    pub fn forward(&mut self, message: Message) -> Result<()> {
        self.callback.forward(message)?;
        self.sent();
        Ok(())
    }

    /// Forward the current input message unchanged.
    ///
    /// A control input is re-emitted as a control message with its header.
    pub fn forward_message(&mut self) -> Result<()> {
        let input = self.current_input()?;
        if input.is_control() {
            let params = input.header().params.clone();
            self.callback.send_control_message(params)?;
        } else {
            let message = input.clone();
            self.callback.forward(message)?;
        }
        self.sent();
        Ok(())
    }

    pub fn forward_message_with_parameter(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let mut params = HeaderParams::new();
        params.insert(name.to_string(), value.into());
        self.forward_message_with_parameters(params)
    }

    /// Forward the current input with extra header parameters.
    ///
    /// A control input becomes a control message carrying only `params`.
    pub fn forward_message_with_parameters(&mut self, params: HeaderParams) -> Result<()> {
        let input = self.current_input()?;
        if input.is_control() {
            self.callback.send_control_message(params)?;
        } else {
            let message = input.clone();
            self.callback.forward_with_params(params, message)?;
        }
        self.sent();
        Ok(())
    }

    pub fn send_control_message(&mut self) -> Result<()> {
        self.callback.send_control_message(HeaderParams::new())?;
        self.sent();
        Ok(())
    }
}

impl Deref for ScriptScope<'_> {
    type Target = ScriptHelper;

    fn deref(&self) -> &ScriptHelper {
        self.helper
    }
}

impl DerefMut for ScriptScope<'_> {
    fn deref_mut(&mut self) -> &mut ScriptHelper {
        self.helper
    }
}

/// Lifecycle hooks user code can implement.
///
/// The host decides when each hook fires: `on_init` before the first message,
/// `on_handle` per message, `on_error` on any failure of the other hooks, and
/// `on_success` once the flow completed without error.
pub trait ScriptHooks: Send {
    fn on_init(&mut self, _helper: &mut ScriptHelper) -> Result<()> {
        Ok(())
    }

    fn on_handle(&mut self, scope: &mut ScriptScope<'_>) -> Result<()>;

    fn on_error(&mut self, _helper: &mut ScriptHelper, _error: &ComponentError) {}

    fn on_success(&mut self, _scope: &mut ScriptScope<'_>) -> Result<()> {
        Ok(())
    }
}

/// A closure handling each message
impl<F> ScriptHooks for F
where
    F: FnMut(&mut ScriptScope<'_>) -> Result<()> + Send,
{
    fn on_handle(&mut self, scope: &mut ScriptScope<'_>) -> Result<()> {
        self(scope)
    }
}

/// Component hosting user script hooks.
pub struct ScriptComponent<H: ScriptHooks> {
    hooks: H,
    helper: Option<ScriptHelper>,
}

impl<H: ScriptHooks> ScriptComponent<H> {
    pub fn new(hooks: H) -> Self {
        Self { hooks, helper: None }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn helper(&self) -> Option<&ScriptHelper> {
        self.helper.as_ref()
    }
}

impl<H: ScriptHooks> ComponentRuntime for ScriptComponent<H> {
    fn component_type(&self) -> &str {
        TYPE
    }

    fn start(&mut self, context: ComponentContext) -> Result<()> {
        let mut helper = ScriptHelper::new(context);
        if let Err(err) = self.hooks.on_init(&mut helper) {
            self.hooks.on_error(&mut helper, &err);
            return Err(err);
        }
        self.helper = Some(helper);
        Ok(())
    }

    fn handle(&mut self, message: &Message, callback: &mut dyn SendMessageCallback) -> Result<()> {
        let helper = self
            .helper
            .as_mut()
            .ok_or_else(|| ComponentError::misconfigured("Script component must be started before use"))?;

        let statistics = helper.context_mut().statistics_mut();
        statistics.inc_received();
        statistics.inc_entities_processed(message.payload().map_or(0, Vec::len));

        helper.set_input_message(message.clone());
        helper.set_unit_of_work_boundary_reached(message.is_last_of_unit_of_work());

        let result = self.hooks.on_handle(&mut ScriptScope::new(helper, callback));
        if let Err(err) = result {
            self.hooks.on_error(helper, &err);
            return Err(err);
        }
        Ok(())
    }

    fn flow_completed(&mut self, callback: &mut dyn SendMessageCallback) -> Result<()> {
        let helper = self
            .helper
            .as_mut()
            .ok_or_else(|| ComponentError::misconfigured("Script component must be started before use"))?;

        let result = self.hooks.on_success(&mut ScriptScope::new(helper, callback));
        if let Err(err) = result {
            self.hooks.on_error(helper, &err);
            return Err(err);
        }
        Ok(())
    }

    fn context(&self) -> Option<&ComponentContext> {
        self.helper.as_ref().map(ScriptHelper::context)
    }
}
