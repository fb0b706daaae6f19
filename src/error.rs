//! Error types shared by every component in the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ComponentError>;

/// Errors raised while configuring or running a flow component.
#[derive(Error, Debug)]
pub enum ComponentError {
    /// A required model, resource or prerequisite is missing
    #[error("Misconfigured: {0}")]
    Misconfigured(String),

    /// A configuration entry cannot be honoured (e.g. unresolvable mapping target)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A by-name lookup of an entity, attribute or component failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// A resource (data source, directory) failed while in use
    #[error("Resource error: {0}")]
    Resource(String),

    /// User script hook reported a failure
    #[error("Script error: {0}")]
    Script(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ComponentError {
    pub fn misconfigured(msg: impl Into<String>) -> Self {
        ComponentError::Misconfigured(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        ComponentError::Configuration(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ComponentError::NotFound(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ComponentError::misconfigured("input/output model must be defined");
        assert_eq!(err.to_string(), "Misconfigured: input/output model must be defined");

        let err = ComponentError::not_found("attribute CUSTOMER.name");
        assert_eq!(err.to_string(), "Not found: attribute CUSTOMER.name");
    }

    #[test]
    fn test_io_error_conversion() {
        fn open() -> Result<()> {
            std::fs::read("/definitely/not/here")?;
            Ok(())
        }

        assert!(matches!(open(), Err(ComponentError::Io(_))));
    }
}
