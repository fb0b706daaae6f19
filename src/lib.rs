//! # Flowmap: attribute mapping components for data flows
//!
//! Flowmap provides the pieces a data-flow runtime needs to run record
//! processing steps: typed models, record payloads, a message envelope with a
//! unit-of-work boundary flag, and components driven through a small
//! lifecycle contract.
//!
//! ## Features
//!
//! - **Mapping component**: copies attribute values from the input model to
//!   one or more output attributes, optionally nulling unmapped outputs
//! - **Script hooks**: user code hooked into a component's lifecycle with
//!   cursor, attribute, logging and resource helpers
//! - **YAML flow steps**: step settings and models loaded from one file
//! - **Database resources**: optional diesel-backed data sources
//!   (features: `postgres`, `mysql`, `sqlite`)
//!
//! ## Example: mapping step
//!
//! ```yaml
//! id: map-customers
//! name: Map customers
//! component: Mapping
//! settings:
//!   setUnmappedAttributesToNull: true
//! attribute_settings:
//!   - attribute_id: in-name
//!     name: mapsTo
//!     value: CUSTOMER.full_name
//! ```

pub mod builders;
pub mod config;
pub mod entity;
pub mod error;
pub mod message;
pub mod model;
pub mod runtime;
pub mod serialization;

// Optional database resources
pub mod diesel_runtime;

// Re-export commonly used types
pub use config::{AttributeSetting, FlowStep, FlowStepConfig};
pub use entity::{EntityData, FieldValue, Payload};
pub use error::{ComponentError, Result};
pub use message::{HeaderParams, Message, MessageBody, MessageHeader};
pub use model::{Model, ModelAttribute, ModelEntity};
pub use runtime::{
    ComponentContext, ComponentFactory, ComponentRuntime, Mapping, ScriptComponent, ScriptHooks,
    SendMessageCallback,
};
