//! Configuration loading from env, TOML, JSON, XML and YAML sources.

mod driver;
mod env;
mod error;
mod formats;
mod loader;
mod registry;
mod xml;

pub use driver::{DriverKind, FormatDriver};
pub use env::{export_env, EnvDriver};
pub use error::ConfigError;
pub use formats::{ArrayDriver, JsonDriver, ValueDriver, YamlDriver};
pub use loader::{ConfigLoader, LoadHandler};
pub use registry::{ConfigRegistry, LoadMode, SharedLoader};
pub use xml::{XmlDriver, ATTRIBUTES_KEY};

/// Flat key/value data produced by every driver.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;
