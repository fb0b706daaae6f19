//! Component lifecycle contract and the per-instance context.

use crate::config::{FlowStep, FlowStepConfig};
use crate::error::{ComponentError, Result};
use crate::message::Message;
use crate::model::Model;
use crate::runtime::callback::SendMessageCallback;
use crate::runtime::resource::ResourceRuntime;
use crate::runtime::statistics::ComponentStatistics;
use crate::runtime::tracker::{ExecutionTracker, LogLevel, TracingExecutionTracker};
use std::fmt;
use std::sync::Arc;

/// Everything one component instance is started with.
///
/// Constructed fresh for each instance; models are shared read-only.
#[derive(Clone)]
pub struct ComponentContext {
    flow_step: FlowStep,
    input_model: Option<Arc<Model>>,
    output_model: Option<Arc<Model>>,
    resource: Option<ResourceRuntime>,
    statistics: ComponentStatistics,
    tracker: Arc<dyn ExecutionTracker>,
    thread_number: usize,
}

impl fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentContext")
            .field("flow_step", &self.flow_step.id)
            .field("input_model", &self.input_model.as_ref().map(|m| m.name().to_string()))
            .field("output_model", &self.output_model.as_ref().map(|m| m.name().to_string()))
            .field("resource", &self.resource)
            .field("statistics", &self.statistics)
            .field("thread_number", &self.thread_number)
            .finish_non_exhaustive()
    }
}

impl ComponentContext {
    pub fn new(flow_step: FlowStep) -> Self {
        Self {
            flow_step,
            input_model: None,
            output_model: None,
            resource: None,
            statistics: ComponentStatistics::new(),
            tracker: Arc::new(TracingExecutionTracker),
            thread_number: 0,
        }
    }

    /// Build a context from a loaded flow step configuration.
    pub fn from_config(config: FlowStepConfig) -> Self {
        let FlowStepConfig {
            step,
            input_model,
            output_model,
        } = config;

        let mut context = Self::new(step);
        context.input_model = input_model.map(Arc::new);
        context.output_model = output_model.map(Arc::new);
        context
    }

    pub fn with_input_model(mut self, model: impl Into<Arc<Model>>) -> Self {
        self.input_model = Some(model.into());
        self
    }

    pub fn with_output_model(mut self, model: impl Into<Arc<Model>>) -> Self {
        self.output_model = Some(model.into());
        self
    }

    pub fn with_resource(mut self, resource: ResourceRuntime) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn ExecutionTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_thread_number(mut self, thread_number: usize) -> Self {
        self.thread_number = thread_number;
        self
    }

    pub fn flow_step(&self) -> &FlowStep {
        &self.flow_step
    }

    pub fn input_model(&self) -> Option<&Arc<Model>> {
        self.input_model.as_ref()
    }

    pub fn output_model(&self) -> Option<&Arc<Model>> {
        self.output_model.as_ref()
    }

    /// The input model, or `Misconfigured` when the step has none.
    pub fn require_input_model(&self) -> Result<&Arc<Model>> {
        self.input_model.as_ref().ok_or_else(|| {
            ComponentError::misconfigured(format!(
                "Step '{}' needs an input model to work with entity data",
                self.flow_step.id
            ))
        })
    }

    pub fn resource(&self) -> Option<&ResourceRuntime> {
        self.resource.as_ref()
    }

    pub fn statistics(&self) -> &ComponentStatistics {
        &self.statistics
    }

    pub fn statistics_mut(&mut self) -> &mut ComponentStatistics {
        &mut self.statistics
    }

    pub fn tracker(&self) -> &Arc<dyn ExecutionTracker> {
        &self.tracker
    }

    pub fn thread_number(&self) -> usize {
        self.thread_number
    }

    /// Log through the execution tracker, tagged with this instance's thread.
    pub fn log(&self, level: LogLevel, message: &str) {
        self.tracker.log(self.thread_number, level, &self.flow_step, message);
    }
}

/// A pipeline stage driven by the flow runtime.
///
/// The runtime calls `start` once, then `handle` for each message of the
/// stream in order, never concurrently for one instance.
pub trait ComponentRuntime: Send {
    /// Registered type name (e.g. "Mapping")
    fn component_type(&self) -> &str;

    fn start(&mut self, context: ComponentContext) -> Result<()>;

    fn handle(&mut self, message: &Message, callback: &mut dyn SendMessageCallback) -> Result<()>;

    /// Called once after the flow finished without error.
    fn flow_completed(&mut self, _callback: &mut dyn SendMessageCallback) -> Result<()> {
        Ok(())
    }

    /// Context the component was started with, if started.
    fn context(&self) -> Option<&ComponentContext>;
}
