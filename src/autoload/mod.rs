//! Naming-convention autoloading of models, services, libraries and helpers.
//!
//! A model `User` resolves to the class `{model prefix}UserModel`, a service
//! `Billing` to `{service prefix}BillingService`, and a library `Cache` to
//! `System\Library\Cache` or `{library prefix}Cache`. Resolved instances are
//! attached to a [`Load`] target under the name with its first letter
//! lowercased.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::config::ConfigLoader;
use crate::container::{Container, ContainerError, Instance, ResolveData};
use crate::ErrorCode;

/// Namespace searched first for libraries.
pub const SYSTEM_LIBRARY_PREFIX: &str = "System\\Library\\";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Model,
    Service,
    Library,
    Helper,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComponentKind::Model => "model",
            ComponentKind::Service => "service",
            ComponentKind::Library => "library",
            ComponentKind::Helper => "helper",
        })
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AutoloadError {
    #[error("unable to locate {kind} '{name}' (tried: {})", .candidates.join(", "))]
    ComponentNotFound {
        kind: ComponentKind,
        name: String,
        candidates: Vec<String>,
    },

    #[error("helper cannot attach to a load target: {0}")]
    NotAttachable(String),

    #[error(transparent)]
    Container(#[from] ContainerError),
}

impl AutoloadError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AutoloadError::ComponentNotFound {
                kind: ComponentKind::Helper,
                ..
            } => ErrorCode::ClassOrFileNotFound,
            AutoloadError::ComponentNotFound { .. } => ErrorCode::ClassNotFound,
            AutoloadError::NotAttachable(_) => ErrorCode::InvalidState,
            AutoloadError::Container(e) => e.code(),
        }
    }
}

/// Class-name prefixes for each component kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefixes {
    pub model: String,
    pub service: String,
    pub library: String,
    pub helper: String,
}

impl Default for Prefixes {
    fn default() -> Self {
        Self {
            model: "App\\Model\\".to_string(),
            service: "App\\Service\\".to_string(),
            library: SYSTEM_LIBRARY_PREFIX.to_string(),
            helper: "App\\Helper\\".to_string(),
        }
    }
}

impl Prefixes {
    /// Defaults overridden by any `model`/`service`/`library`/`helper`
    /// string keys in the loader's data.
    pub fn from_config(config: &ConfigLoader) -> Self {
        let mut prefixes = Self::default();
        let overrides = [
            ("model", &mut prefixes.model),
            ("service", &mut prefixes.service),
            ("library", &mut prefixes.library),
            ("helper", &mut prefixes.helper),
        ];
        for (key, slot) in overrides {
            if let Some(value) = config.get(key).and_then(|v| v.as_str()) {
                *slot = value.to_string();
            }
        }
        prefixes
    }

    pub fn get(&self, kind: ComponentKind) -> &str {
        match kind {
            ComponentKind::Model => &self.model,
            ComponentKind::Service => &self.service,
            ComponentKind::Library => &self.library,
            ComponentKind::Helper => &self.helper,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(name)) => vec![name],
        Some(OneOrMany::Many(names)) => names,
        None => Vec::new(),
    })
}

/// Components to autoload, per kind. Each kind accepts a single name or a list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Autoloads {
    #[serde(default, deserialize_with = "one_or_many")]
    pub model: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub service: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub library: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub helper: Vec<String>,
}

/// Target that receives autoloaded components, one namespace per kind.
#[derive(Default)]
pub struct Load {
    model: HashMap<String, Instance>,
    service: HashMap<String, Instance>,
    library: HashMap<String, Instance>,
}

impl Load {
    pub fn new() -> Self {
        Self::default()
    }

    fn namespace(&self, kind: ComponentKind) -> Option<&HashMap<String, Instance>> {
        match kind {
            ComponentKind::Model => Some(&self.model),
            ComponentKind::Service => Some(&self.service),
            ComponentKind::Library => Some(&self.library),
            ComponentKind::Helper => None,
        }
    }

    /// Attaches `instance` under `key` in the namespace for `kind`.
    pub fn add_class(
        &mut self,
        kind: ComponentKind,
        key: impl Into<String>,
        instance: Instance,
    ) -> Result<(), AutoloadError> {
        let key = key.into();
        let namespace = match kind {
            ComponentKind::Model => &mut self.model,
            ComponentKind::Service => &mut self.service,
            ComponentKind::Library => &mut self.library,
            ComponentKind::Helper => return Err(AutoloadError::NotAttachable(key)),
        };
        namespace.insert(key, instance);
        Ok(())
    }

    pub fn get(&self, kind: ComponentKind, key: &str) -> Option<&Instance> {
        self.namespace(kind)?.get(key)
    }

    pub fn get_as<T: Any>(&self, kind: ComponentKind, key: &str) -> Option<Rc<T>> {
        self.get(kind, key)
            .and_then(|obj| Rc::clone(obj).downcast::<T>().ok())
    }

    pub fn model(&self, key: &str) -> Option<&Instance> {
        self.model.get(key)
    }

    pub fn service(&self, key: &str) -> Option<&Instance> {
        self.service.get(key)
    }

    pub fn library(&self, key: &str) -> Option<&Instance> {
        self.library.get(key)
    }
}

impl fmt::Debug for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Load")
            .field("model", &self.model.keys().collect::<Vec<_>>())
            .field("service", &self.service.keys().collect::<Vec<_>>())
            .field("library", &self.library.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Resolves components by naming convention through a [`Container`].
#[derive(Debug, Clone, Default)]
pub struct ComponentLoader {
    prefixes: Prefixes,
}

impl ComponentLoader {
    pub fn new(prefixes: Prefixes) -> Self {
        Self { prefixes }
    }

    pub fn from_config(config: &ConfigLoader) -> Self {
        Self::new(Prefixes::from_config(config))
    }

    pub fn prefixes(&self) -> &Prefixes {
        &self.prefixes
    }

    /// Loads every listed component into `target`, kind by kind.
    pub fn autoload(
        &self,
        container: &Container,
        target: &mut Load,
        autoloads: &Autoloads,
    ) -> Result<(), AutoloadError> {
        self.model(container, target, &autoloads.model)?;
        self.service(container, target, &autoloads.service)?;
        self.library(container, target, &autoloads.library)?;
        self.helper(container, &autoloads.helper)?;
        Ok(())
    }

    pub fn model(
        &self,
        container: &Container,
        target: &mut Load,
        models: &[String],
    ) -> Result<(), AutoloadError> {
        for model in models {
            let class = format!("{}{}Model", self.prefixes.model, model);
            self.attach(container, target, ComponentKind::Model, model, &[class])?;
        }
        Ok(())
    }

    pub fn service(
        &self,
        container: &Container,
        target: &mut Load,
        services: &[String],
    ) -> Result<(), AutoloadError> {
        for service in services {
            let class = format!("{}{}Service", self.prefixes.service, service);
            self.attach(container, target, ComponentKind::Service, service, &[class])?;
        }
        Ok(())
    }

    pub fn library(
        &self,
        container: &Container,
        target: &mut Load,
        libraries: &[String],
    ) -> Result<(), AutoloadError> {
        for library in libraries {
            let mut candidates = vec![format!("{SYSTEM_LIBRARY_PREFIX}{library}")];
            let custom = format!("{}{}", self.prefixes.library, library);
            if !candidates.contains(&custom) {
                candidates.push(custom);
            }
            self.attach(container, target, ComponentKind::Library, library, &candidates)?;
        }
        Ok(())
    }

    /// Checks that each helper is known to the container. Helpers are not
    /// attached to the target.
    pub fn helper(&self, container: &Container, helpers: &[String]) -> Result<(), AutoloadError> {
        for helper in helpers {
            let class = format!("{}{}", self.prefixes.helper, helper);
            if !(container.is_class_registered(&class) || container.is_class_defined(&class)) {
                return Err(AutoloadError::ComponentNotFound {
                    kind: ComponentKind::Helper,
                    name: helper.clone(),
                    candidates: vec![class],
                });
            }
            tracing::trace!(helper = %class, "helper available");
        }
        Ok(())
    }

    fn attach(
        &self,
        container: &Container,
        target: &mut Load,
        kind: ComponentKind,
        name: &str,
        candidates: &[String],
    ) -> Result<(), AutoloadError> {
        for class in candidates {
            if let Some(instance) = instantiate(container, class)? {
                tracing::debug!(kind = %kind, class = %class, "autoloaded component");
                return target.add_class(kind, lcfirst(name), instance);
            }
        }

        Err(AutoloadError::ComponentNotFound {
            kind,
            name: name.to_string(),
            candidates: candidates.to_vec(),
        })
    }
}

/// Returns the registered binding for `class`, or builds it from its
/// definition. `None` when the container knows neither.
fn instantiate(container: &Container, class: &str) -> Result<Option<Instance>, ContainerError> {
    if container.is_class_registered(class) {
        return container.get(class).map(Some);
    }
    if container.is_class_defined(class) {
        return container.resolve(class, &ResolveData::new()).map(Some);
    }
    Ok(None)
}

fn lcfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
