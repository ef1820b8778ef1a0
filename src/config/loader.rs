use std::fmt;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::driver::{configured_file, DriverKind, FormatDriver};
use super::{ConfigError, ConfigMap};

/// Callback invoked with the freshly loaded data at the end of every [`ConfigLoader::load`].
pub type LoadHandler = Box<dyn FnMut(&ConfigMap)>;

/// A driver instance holding its settings and the loaded key/value data.
///
/// Settings are fixed at construction. Data is empty until [`load`](Self::load)
/// is called and can be changed afterwards with [`set`](Self::set),
/// [`merge`](Self::merge) and [`override_with`](Self::override_with).
///
/// ## Example
///
/// ```no_run
/// use dragon_loader::config::{ConfigLoader, DriverKind};
/// use serde_json::json;
///
/// let settings = json!({ "file": "config/app.json" });
/// let mut loader = ConfigLoader::new(DriverKind::Json, settings.as_object().cloned().unwrap());
/// loader.load()?;
///
/// let name = loader.get("name");
/// # Ok::<(), dragon_loader::ConfigError>(())
/// ```
pub struct ConfigLoader {
    driver: Box<dyn FormatDriver>,
    settings: ConfigMap,
    data: ConfigMap,
    load_handler: Option<LoadHandler>,
}

impl ConfigLoader {
    /// Creates an unloaded loader using the built-in driver for `kind`.
    pub fn new(kind: DriverKind, settings: ConfigMap) -> Self {
        Self::with_driver(kind.driver(), settings)
    }

    /// Creates a loader around a custom driver.
    pub fn with_driver(driver: Box<dyn FormatDriver>, settings: ConfigMap) -> Self {
        Self {
            driver,
            settings,
            data: ConfigMap::new(),
            load_handler: None,
        }
    }

    /// Returns the driver kind.
    pub fn kind(&self) -> DriverKind {
        self.driver.kind()
    }

    /// Returns the driver settings.
    pub fn settings(&self) -> &ConfigMap {
        &self.settings
    }

    /// Resolves the configured source file.
    ///
    /// Fails if no `file` setting exists, the file does not exist, or its
    /// extension is not one the driver accepts.
    pub fn file(&self) -> Result<PathBuf, ConfigError> {
        configured_file(&self.settings, self.driver.valid_file_types())
    }

    /// Extracts data from the source, replacing any previously loaded data.
    ///
    /// The load handler, if any, runs afterwards with the new data.
    pub fn load(&mut self) -> Result<&mut Self, ConfigError> {
        self.data = self.driver.extract(&self.settings)?;
        tracing::debug!(driver = %self.kind(), keys = self.data.len(), "configuration loaded");

        if let Some(handler) = self.load_handler.as_mut() {
            handler(&self.data);
        }

        Ok(self)
    }

    /// Returns the loaded value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns the value for `key`, or `default` when it is absent.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.data.get(key).cloned().unwrap_or(default)
    }

    /// Returns all loaded data.
    pub fn get_all(&self) -> &ConfigMap {
        &self.data
    }

    /// Merges `data` into the loaded data. Incoming keys win.
    pub fn merge(&mut self, data: ConfigMap) {
        self.data.extend(data);
    }

    /// Writes `value` under `key`.
    ///
    /// In strict mode the key must already exist.
    pub fn set(&mut self, key: &str, value: Value, strict: bool) -> Result<(), ConfigError> {
        if strict && !self.data.contains_key(key) {
            return Err(ConfigError::KeyNotFound(key.to_string()));
        }

        self.data.insert(key.to_string(), value);
        Ok(())
    }

    /// Replaces the loaded data wholesale.
    pub fn override_with(&mut self, data: ConfigMap) {
        self.data = data;
    }

    /// Sets a callback that runs after every successful [`load`](Self::load).
    pub fn set_load_handler(&mut self, handler: impl FnMut(&ConfigMap) + 'static) {
        self.load_handler = Some(Box::new(handler));
    }

    /// Deserializes the loaded data into a typed configuration struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("driver", &self.driver)
            .field("settings", &self.settings)
            .field("data", &self.data)
            .field("load_handler", &self.load_handler.is_some())
            .finish()
    }
}
