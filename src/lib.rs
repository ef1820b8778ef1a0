pub mod autoload;
pub mod config;
pub mod container;
pub mod context;
mod error;

pub use autoload::{AutoloadError, ComponentLoader, Load};
pub use config::{ConfigError, ConfigLoader, ConfigRegistry, DriverKind, LoadMode};
pub use container::{Container, ContainerError};
pub use context::AppContext;
pub use error::{Error, ErrorCode};
