use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::json;

use super::driver::DriverKind;
use super::loader::ConfigLoader;
use super::{ConfigError, ConfigMap};

/// A loader shared between the registry and its callers.
pub type SharedLoader = Rc<RefCell<ConfigLoader>>;

/// How [`ConfigRegistry::load_config`] treats a loader already registered under the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Return the registered loader as-is, without reloading.
    Read,
    /// Load the file and merge its data into the registered loader.
    Append,
    /// Always load a new loader and register it, replacing any previous one.
    #[default]
    Fresh,
}

/// Named loaders, owned by the application rather than held in a global.
///
/// At most one loader occupies a name; registering again replaces it.
#[derive(Debug, Default)]
pub struct ConfigRegistry {
    loaders: HashMap<String, SharedLoader>,
}

impl ConfigRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs an unloaded loader for the named driver kind.
    ///
    /// When `name` is given the loader is registered under it.
    pub fn get_instance(
        &mut self,
        driver: &str,
        settings: ConfigMap,
        name: Option<&str>,
    ) -> Result<SharedLoader, ConfigError> {
        let kind: DriverKind = driver.parse()?;
        tracing::debug!(driver = %kind, name = ?name, "creating config loader");

        let loader = Rc::new(RefCell::new(ConfigLoader::new(kind, settings)));
        if let Some(name) = name {
            self.register(name, Rc::clone(&loader));
        }
        Ok(loader)
    }

    /// Loads a config file, picking the driver from its extension.
    ///
    /// The loader is registered under `name`, or under the file path when no
    /// name is given.
    pub fn load_config(
        &mut self,
        path: impl AsRef<Path>,
        name: Option<&str>,
        mode: LoadMode,
    ) -> Result<SharedLoader, ConfigError> {
        let path = path.as_ref();
        let kind = DriverKind::from_path(path)?;
        let key = name
            .map(str::to_string)
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        let existing = self.get_config(&key);
        match (mode, existing) {
            (LoadMode::Read, Some(loader)) => {
                tracing::trace!(name = %key, "returning registered config without reload");
                return Ok(loader);
            }
            (LoadMode::Append, Some(loader)) => {
                let data = load_file(kind, path)?;
                tracing::debug!(name = %key, keys = data.len(), "appending config data");
                loader.borrow_mut().merge(data);
                return Ok(loader);
            }
            _ => {}
        }

        let mut loader = ConfigLoader::new(kind, file_settings(path));
        loader.load()?;

        let loader = Rc::new(RefCell::new(loader));
        self.register(&key, Rc::clone(&loader));
        Ok(loader)
    }

    /// Looks up a registered loader. Never fails.
    pub fn get_config(&self, name: &str) -> Option<SharedLoader> {
        self.loaders.get(name).cloned()
    }

    /// Registers `loader` under `name`, replacing any previous loader.
    pub fn register(&mut self, name: &str, loader: SharedLoader) {
        if self.loaders.insert(name.to_string(), loader).is_some() {
            tracing::debug!(name = %name, "replaced registered config loader");
        }
    }

    /// Unregisters and returns the loader under `name`.
    pub fn remove(&mut self, name: &str) -> Option<SharedLoader> {
        self.loaders.remove(name)
    }

    /// Returns the registered names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }
}

fn file_settings(path: &Path) -> ConfigMap {
    let mut settings = ConfigMap::new();
    settings.insert("file".to_string(), json!(path.to_string_lossy()));
    settings
}

fn load_file(kind: DriverKind, path: &Path) -> Result<ConfigMap, ConfigError> {
    let mut loader = ConfigLoader::new(kind, file_settings(path));
    loader.load()?;
    Ok(loader.get_all().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    fn map(value: Value) -> ConfigMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_get_instance_covers_every_driver() {
        let mut registry = ConfigRegistry::new();
        for name in ["value", "env", "array", "json", "xml", "yaml"] {
            let loader = registry.get_instance(name, ConfigMap::new(), None).unwrap();
            assert_eq!(loader.borrow().kind().name(), name);
        }
    }

    #[test]
    fn test_get_instance_unknown_driver() {
        let mut registry = ConfigRegistry::new();
        let err = registry
            .get_instance("dd", map(json!({ "key": "value" })), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedDriver(_)));
        assert_eq!(err.code(), crate::ErrorCode::DriverNotFound);
    }

    #[test]
    fn test_named_instance_is_registered() {
        let mut registry = ConfigRegistry::new();
        registry
            .get_instance("value", map(json!({ "key": "value" })), Some("config"))
            .unwrap();

        let loader = registry.get_config("config").unwrap();
        loader.borrow_mut().set_load_handler(|_| {});
        loader.borrow_mut().load().unwrap();
        assert_eq!(loader.borrow().get("key"), Some(&json!("value")));

        assert!(registry.get_config("missing").is_none());
    }

    #[test]
    fn test_later_registration_replaces_earlier() {
        let mut registry = ConfigRegistry::new();
        let first = registry.get_instance("value", ConfigMap::new(), Some("app")).unwrap();
        let second = registry.get_instance("json", ConfigMap::new(), Some("app")).unwrap();

        let current = registry.get_config("app").unwrap();
        assert!(Rc::ptr_eq(&current, &second));
        assert!(!Rc::ptr_eq(&current, &first));
        assert_eq!(registry.names().count(), 1);
    }

    #[test]
    fn test_load_config_json_end_to_end() {
        let file = fixture(".json", r#"{"name":"test","value":1}"#);
        let mut registry = ConfigRegistry::new();

        let loader = registry.load_config(file.path(), None, LoadMode::Fresh).unwrap();
        assert_eq!(
            Value::Object(loader.borrow().get_all().clone()),
            json!({ "name": "test", "value": 1 })
        );
    }

    #[test]
    fn test_load_config_every_format() {
        let expected = json!({ "name": "test", "value": 1 });
        let cases = [
            (".json", r#"{"name":"test","value":1}"#.to_string()),
            (".yaml", "name: test\nvalue: 1\n".to_string()),
            (".yml", "name: test\nvalue: 1\n".to_string()),
            (".toml", "name = \"test\"\nvalue = 1\n".to_string()),
        ];

        let mut registry = ConfigRegistry::new();
        for (suffix, contents) in cases {
            let file = fixture(suffix, &contents);
            let loader = registry.load_config(file.path(), Some("config"), LoadMode::Fresh).unwrap();
            assert_eq!(Value::Object(loader.borrow().get_all().clone()), expected, "{suffix}");
        }

        let file = fixture(".xml", "<config><name>test</name><value>1</value></config>");
        let loader = registry.load_config(file.path(), Some("config"), LoadMode::Fresh).unwrap();
        assert_eq!(
            Value::Object(loader.borrow().get_all().clone()),
            json!({ "name": "test", "value": "1" })
        );

        let file = fixture(".env", "\n \n#test\nKEY1=value1\nKEY2=value2\n");
        let loader = registry.load_config(file.path(), None, LoadMode::Fresh).unwrap();
        assert_eq!(
            Value::Object(loader.borrow().get_all().clone()),
            json!({ "KEY1": "value1", "KEY2": "value2" })
        );
    }

    #[test]
    fn test_load_config_unsupported_extension() {
        let file = fixture(".txt", "hello");
        let mut registry = ConfigRegistry::new();

        let err = registry
            .load_config(file.path(), None, LoadMode::Fresh)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFileType(_)));
        assert_eq!(err.code(), crate::ErrorCode::FileTypeNotSupported);
    }

    #[test]
    fn test_read_mode_returns_registered_without_reload() {
        let file = fixture(".json", r#"{"name":"test"}"#);
        let mut registry = ConfigRegistry::new();

        let first = registry.load_config(file.path(), Some("app"), LoadMode::Fresh).unwrap();
        first.borrow_mut().set("name", json!("changed"), true).unwrap();

        let again = registry.load_config(file.path(), Some("app"), LoadMode::Read).unwrap();
        assert!(Rc::ptr_eq(&first, &again));
        assert_eq!(again.borrow().get("name"), Some(&json!("changed")));
    }

    #[test]
    fn test_read_mode_loads_when_absent() {
        let file = fixture(".json", r#"{"name":"test"}"#);
        let mut registry = ConfigRegistry::new();

        let loader = registry.load_config(file.path(), Some("app"), LoadMode::Read).unwrap();
        assert_eq!(loader.borrow().get("name"), Some(&json!("test")));
        assert!(registry.get_config("app").is_some());
    }

    #[test]
    fn test_append_mode_merges_into_registered() {
        let base = fixture(".json", r#"{"name":"base","debug":false}"#);
        let local = fixture(".yaml", "debug: true\nextra: 1\n");
        let mut registry = ConfigRegistry::new();

        let first = registry.load_config(base.path(), Some("app"), LoadMode::Fresh).unwrap();
        let appended = registry.load_config(local.path(), Some("app"), LoadMode::Append).unwrap();

        assert!(Rc::ptr_eq(&first, &appended));
        assert_eq!(
            Value::Object(appended.borrow().get_all().clone()),
            json!({ "name": "base", "debug": true, "extra": 1 })
        );
    }

    #[test]
    fn test_fresh_mode_replaces_registered() {
        let base = fixture(".json", r#"{"name":"base"}"#);
        let other = fixture(".json", r#"{"other":true}"#);
        let mut registry = ConfigRegistry::new();

        let first = registry.load_config(base.path(), Some("app"), LoadMode::Fresh).unwrap();
        let second = registry.load_config(other.path(), Some("app"), LoadMode::Fresh).unwrap();

        assert!(!Rc::ptr_eq(&first, &second));
        let current = registry.get_config("app").unwrap();
        assert!(Rc::ptr_eq(&current, &second));
        assert_eq!(current.borrow().get("name"), None);
    }

    #[test]
    fn test_load_mode_deserializes_lowercase() {
        let mode: LoadMode = serde_json::from_value(json!("append")).unwrap();
        assert_eq!(mode, LoadMode::Append);
        assert_eq!(LoadMode::default(), LoadMode::Fresh);
    }
}
