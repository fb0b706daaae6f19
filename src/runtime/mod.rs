//! Component runtime: lifecycle contract, forwarding callback, built-in
//! components and the scripting extension surface.

pub mod callback;
pub mod component;
pub mod mapping;
pub mod registry;
pub mod resource;
pub mod script;
pub mod statistics;
pub mod tracker;

// Re-export key types
pub use callback::{CollectingCallback, SendMessageCallback};
pub use component::{ComponentContext, ComponentRuntime};
pub use mapping::{Mapping, ResolvedMapping, UnresolvedMapping};
pub use registry::{ComponentDefinition, ComponentFactory, SettingDefinition, SettingKind};
pub use resource::{DataSource, Directory, LocalDirectory, ResourceReference, ResourceRuntime};
pub use script::{ScriptComponent, ScriptHelper, ScriptHooks, ScriptScope};
pub use statistics::ComponentStatistics;
pub use tracker::{ExecutionTracker, LogLevel, MemoryExecutionTracker, TracingExecutionTracker};
