use thiserror::Error;

use crate::ErrorCode;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContainerError {
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("method '{method}' not found on class {class}")]
    MethodNotFound { class: String, method: String },

    #[error("cannot instantiate abstract class or interface: {0}")]
    NotInstantiable(String),

    #[error("missing argument: {0}")]
    MissingArgument(String),

    #[error("argument '{name}' is not of type {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },

    #[error("invalid service definition '{name}': {source}")]
    InvalidDefinition {
        name: String,
        source: serde_json::Error,
    },

    #[error("circular dependency: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),
}

impl ContainerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ContainerError::ServiceNotFound(_) => ErrorCode::ServiceNotFound,
            ContainerError::ClassNotFound(_) | ContainerError::MethodNotFound { .. } => {
                ErrorCode::ClassNotFound
            }
            ContainerError::NotInstantiable(_)
            | ContainerError::MissingArgument(_)
            | ContainerError::TypeMismatch { .. }
            | ContainerError::InvalidDefinition { .. }
            | ContainerError::CircularDependency(_) => ErrorCode::InvalidState,
        }
    }
}
