//! Drivers that delegate to an existing format parser.

use std::path::Path;

use serde_json::{Map, Number, Value};

use super::driver::{configured_file, read_file, DriverKind, FormatDriver};
use super::{ConfigError, ConfigMap};

/// Returns the settings mapping verbatim. Performs no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueDriver;

impl ValueDriver {
    pub(crate) fn boxed() -> Box<dyn FormatDriver> {
        Box::new(Self)
    }
}

impl FormatDriver for ValueDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Value
    }

    fn extract(&self, settings: &ConfigMap) -> Result<ConfigMap, ConfigError> {
        Ok(settings.clone())
    }
}

/// Loads a native key/value table. In Rust the array file is a TOML document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayDriver;

impl ArrayDriver {
    pub(crate) fn boxed() -> Box<dyn FormatDriver> {
        Box::new(Self)
    }
}

impl FormatDriver for ArrayDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Array
    }

    fn extract(&self, settings: &ConfigMap) -> Result<ConfigMap, ConfigError> {
        let path = configured_file(settings, self.valid_file_types())?;
        let table: toml::Table =
            toml::from_str(&read_file(&path)?).map_err(|e| ConfigError::TomlError {
                path: path.clone(),
                source: e,
            })?;

        Ok(table
            .into_iter()
            .map(|(key, value)| (key, toml_to_json(value)))
            .collect())
    }
}

/// Converts a TOML value into the shared JSON value model.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(t) => {
            Value::Object(t.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDriver;

impl JsonDriver {
    pub(crate) fn boxed() -> Box<dyn FormatDriver> {
        Box::new(Self)
    }
}

impl FormatDriver for JsonDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Json
    }

    fn extract(&self, settings: &ConfigMap) -> Result<ConfigMap, ConfigError> {
        let path = configured_file(settings, self.valid_file_types())?;
        let value: Value =
            serde_json::from_str(&read_file(&path)?).map_err(|e| ConfigError::JsonError {
                path: path.clone(),
                source: e,
            })?;

        into_mapping(value, &path)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDriver;

impl YamlDriver {
    pub(crate) fn boxed() -> Box<dyn FormatDriver> {
        Box::new(Self)
    }
}

impl FormatDriver for YamlDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Yaml
    }

    fn extract(&self, settings: &ConfigMap) -> Result<ConfigMap, ConfigError> {
        let path = configured_file(settings, self.valid_file_types())?;
        let value: Value =
            serde_yaml::from_str(&read_file(&path)?).map_err(|e| ConfigError::YamlError {
                path: path.clone(),
                source: e,
            })?;

        into_mapping(value, &path)
    }
}

/// A null document loads as an empty mapping; any other non-object is rejected.
fn into_mapping(value: Value, path: &Path) -> Result<ConfigMap, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(ConfigError::NotAMapping(path.to_path_buf())),
    }
}
