//! Declarative service definitions, as found in configuration files.

use std::fmt;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;

use super::{Arg, Container, ContainerError, Factory, Instance};

/// Strings starting with this marker (case-insensitive) are never treated
/// as references to registered services.
pub const LITERAL_MARKER: &str = "\\s";

/// Produces a parameter value on demand.
pub type ParamFactory = Rc<dyn Fn(&Container) -> Result<Arg, ContainerError>>;

/// How a single constructor parameter is supplied in a service definition.
#[derive(Clone)]
pub enum ParamSpec {
    /// Passed through unchanged.
    Literal(Value),
    /// An already built object, passed through unchanged.
    Object(Instance),
    /// Invoked at construction time; its result is used.
    Factory(ParamFactory),
    /// A registered service name. Falls back to the string itself when
    /// nothing is registered under it.
    Name(String),
}

impl ParamSpec {
    /// Classifies a raw configuration value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) if has_literal_marker(&s) => ParamSpec::Literal(Value::String(s)),
            Value::String(s) => ParamSpec::Name(s),
            other => ParamSpec::Literal(other),
        }
    }

    pub fn factory(build: impl Fn(&Container) -> Result<Arg, ContainerError> + 'static) -> Self {
        ParamSpec::Factory(Rc::new(build))
    }
}

fn has_literal_marker(s: &str) -> bool {
    s.get(..LITERAL_MARKER.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(LITERAL_MARKER))
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSpec::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            ParamSpec::Object(_) => f.write_str("Object(..)"),
            ParamSpec::Factory(_) => f.write_str("Factory(..)"),
            ParamSpec::Name(name) => f.debug_tuple("Name").field(name).finish(),
        }
    }
}

/// A structured service entry.
#[derive(Debug, Clone, Default)]
pub struct ServiceDefinition {
    pub class: String,
    pub singleton: bool,
    pub params: Option<Vec<(String, ParamSpec)>>,
}

impl ServiceDefinition {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            ..Self::default()
        }
    }

    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    pub fn param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.params
            .get_or_insert_with(Vec::new)
            .push((name.into(), spec));
        self
    }
}

/// One entry of a service configuration.
#[derive(Clone)]
pub enum ServiceEntry {
    /// A bare class name; autowired on access.
    Class(String),
    /// A factory registered as-is.
    Factory(Factory),
    Definition(ServiceDefinition),
}

impl ServiceEntry {
    pub fn factory(
        build: impl Fn(&Container) -> Result<Instance, ContainerError> + 'static,
    ) -> Self {
        ServiceEntry::Factory(Rc::new(build))
    }

    /// Parses an entry from configuration data.
    ///
    /// Strings are class names; objects carry `class`, `singleton` and
    /// `params`. Anything else yields a definition with no class, which
    /// registration skips.
    pub fn from_value(name: &str, value: &Value) -> Result<Self, ContainerError> {
        #[derive(Deserialize)]
        struct RawDefinition {
            #[serde(default)]
            class: String,
            #[serde(default)]
            singleton: bool,
            #[serde(default)]
            params: Option<Value>,
        }

        match value {
            Value::String(class) => Ok(ServiceEntry::Class(class.clone())),
            Value::Object(_) => {
                let raw: RawDefinition = serde_json::from_value(value.clone()).map_err(|e| {
                    ContainerError::InvalidDefinition {
                        name: name.to_string(),
                        source: e,
                    }
                })?;
                Ok(ServiceEntry::Definition(ServiceDefinition {
                    class: raw.class,
                    singleton: raw.singleton,
                    params: raw.params.and_then(params_from_value),
                }))
            }
            _ => Ok(ServiceEntry::Definition(ServiceDefinition::default())),
        }
    }
}

impl fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceEntry::Class(class) => f.debug_tuple("Class").field(class).finish(),
            ServiceEntry::Factory(_) => f.write_str("Factory(..)"),
            ServiceEntry::Definition(def) => f.debug_tuple("Definition").field(def).finish(),
        }
    }
}

/// Objects keep their keys; arrays are keyed by position.
fn params_from_value(value: Value) -> Option<Vec<(String, ParamSpec)>> {
    match value {
        Value::Object(map) => Some(
            map.into_iter()
                .map(|(k, v)| (k, ParamSpec::from_value(v)))
                .collect(),
        ),
        Value::Array(items) => Some(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), ParamSpec::from_value(v)))
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_marker_is_case_insensitive() {
        assert!(matches!(
            ParamSpec::from_value(json!("\\sSomeString")),
            ParamSpec::Literal(Value::String(ref s)) if s == "\\sSomeString"
        ));
        assert!(matches!(
            ParamSpec::from_value(json!("\\Sshout")),
            ParamSpec::Literal(_)
        ));
        assert!(matches!(
            ParamSpec::from_value(json!("RegularString")),
            ParamSpec::Name(ref s) if s == "RegularString"
        ));
        assert!(matches!(ParamSpec::from_value(json!(5)), ParamSpec::Literal(_)));
        assert!(matches!(ParamSpec::from_value(json!("\\")), ParamSpec::Name(_)));
    }

    #[test]
    fn test_entry_from_string() {
        let entry = ServiceEntry::from_value("mailer", &json!("App\\Mailer")).unwrap();
        assert!(matches!(entry, ServiceEntry::Class(ref c) if c == "App\\Mailer"));
    }

    #[test]
    fn test_entry_from_object() {
        let entry = ServiceEntry::from_value(
            "mailer",
            &json!({
                "class": "App\\Mailer",
                "singleton": true,
                "params": { "from": "noreply@example.com", "retries": 3 }
            }),
        )
        .unwrap();

        let ServiceEntry::Definition(def) = entry else {
            panic!("expected definition");
        };
        assert_eq!(def.class, "App\\Mailer");
        assert!(def.singleton);
        let params = def.params.unwrap();
        assert_eq!(params.len(), 2);
        assert!(params.iter().any(|(k, v)| k == "retries" && matches!(v, ParamSpec::Literal(_))));
    }

    #[test]
    fn test_entry_without_class_has_empty_class() {
        let entry = ServiceEntry::from_value("0", &json!({ "service1": "SomeClass" })).unwrap();
        assert!(matches!(entry, ServiceEntry::Definition(ref d) if d.class.is_empty()));
    }

    #[test]
    fn test_positional_params_are_indexed() {
        let params = params_from_value(json!(["a", 2])).unwrap();
        assert_eq!(params[0].0, "0");
        assert_eq!(params[1].0, "1");
    }

    #[test]
    fn test_invalid_definition() {
        let err = ServiceEntry::from_value("bad", &json!({ "class": 42 })).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidDefinition { ref name, .. } if name == "bad"));
    }
}
