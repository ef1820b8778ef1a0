use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::class::{ClassDef, Param, TypeRef};
use super::definition::{ParamSpec, ServiceDefinition, ServiceEntry};
use super::{Arg, Args, ContainerError, Instance};

/// Builds an object on demand, with access to the container for its own dependencies.
pub type Factory = Rc<dyn Fn(&Container) -> Result<Instance, ContainerError>>;

/// Explicit per-call values, keyed by parameter name or by type name.
pub type ResolveData = HashMap<String, Arg>;

/// What is stored under a registered name.
#[derive(Clone)]
pub enum Binding {
    Instance(Instance),
    Factory(Factory),
}

impl Binding {
    /// Wraps an already built value.
    pub fn instance<T: Any>(value: T) -> Self {
        Binding::Instance(Rc::new(value))
    }

    /// Wraps a typed factory.
    pub fn factory<T, F>(build: F) -> Self
    where
        T: Any,
        F: Fn(&Container) -> Result<T, ContainerError> + 'static,
    {
        Binding::Factory(Rc::new(
            move |c: &Container| -> Result<Instance, ContainerError> { Ok(Rc::new(build(c)?)) },
        ))
    }
}

/// A name-keyed registry of singletons and services, plus the class catalog
/// used to autowire constructors.
///
/// Names are case-insensitive. A name lives either in the singleton map or
/// in the service map, never both. Singleton factories run once and their
/// result replaces the factory; service factories run on every [`get`](Self::get).
///
/// The container is single-threaded and uses interior mutability so that
/// factories can call back into it while it is being queried. Re-entering a
/// class or service that is still being built fails with
/// [`ContainerError::CircularDependency`].
///
/// ## Example
///
/// ```
/// use dragon_loader::container::Container;
///
/// struct Clock;
///
/// let container = Container::new();
/// container.set_factory("clock", |_| Ok(Clock), true);
///
/// let first = container.get("clock")?;
/// let second = container.get("Clock")?;
/// assert!(std::rc::Rc::ptr_eq(&first, &second));
/// # Ok::<(), dragon_loader::ContainerError>(())
/// ```
#[derive(Default)]
pub struct Container {
    instances: RefCell<HashMap<String, Binding>>,
    services: RefCell<HashMap<String, Binding>>,
    classes: RefCell<HashMap<String, Rc<ClassDef>>>,
    resolving: RefCell<Vec<Frame>>,
}

/// An entry on the resolution stack. Services and classes may share a name,
/// so the kind is part of the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Frame {
    Service(String),
    Class(String),
}

impl Frame {
    fn name(&self) -> &str {
        match self {
            Frame::Service(name) | Frame::Class(name) => name,
        }
    }
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
}

fn is_numeric(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `build` with `frame` on the resolution stack.
    fn guarded<T>(
        &self,
        frame: Frame,
        build: impl FnOnce() -> Result<T, ContainerError>,
    ) -> Result<T, ContainerError> {
        {
            let mut stack = self.resolving.borrow_mut();
            if let Some(start) = stack.iter().position(|f| *f == frame) {
                let mut chain: Vec<String> =
                    stack[start..].iter().map(|f| f.name().to_string()).collect();
                chain.push(frame.name().to_string());
                tracing::debug!(chain = ?chain, "circular dependency");
                return Err(ContainerError::CircularDependency(chain));
            }
            stack.push(frame);
        }

        let result = build();
        self.resolving.borrow_mut().pop();
        result
    }

    /// Registers `binding` under `name`, as a singleton or as a service.
    pub fn set(&self, name: &str, binding: Binding, singleton: bool) {
        let key = normalize(name);
        tracing::debug!(name = %key, singleton, "registering binding");

        if singleton {
            self.services.borrow_mut().remove(&key);
            self.instances.borrow_mut().insert(key, binding);
        } else {
            self.instances.borrow_mut().remove(&key);
            self.services.borrow_mut().insert(key, binding);
        }
    }

    /// Registers an already built value.
    pub fn set_value<T: Any>(&self, name: &str, value: T, singleton: bool) {
        self.set(name, Binding::instance(value), singleton);
    }

    /// Registers a factory, run once for singletons and on every lookup otherwise.
    pub fn set_factory<T, F>(&self, name: &str, build: F, singleton: bool)
    where
        T: Any,
        F: Fn(&Container) -> Result<T, ContainerError> + 'static,
    {
        self.set(name, Binding::factory(build), singleton);
    }

    /// Looks up `name`, materializing singleton factories on first access.
    pub fn get(&self, name: &str) -> Result<Instance, ContainerError> {
        let key = normalize(name);

        let singleton = self.instances.borrow().get(&key).cloned();
        match singleton {
            Some(Binding::Instance(obj)) => return Ok(obj),
            Some(Binding::Factory(build)) => {
                let obj = self.guarded(Frame::Service(key.clone()), || build(self))?;
                tracing::trace!(name = %key, "materialized singleton");
                self.instances
                    .borrow_mut()
                    .insert(key, Binding::Instance(Rc::clone(&obj)));
                return Ok(obj);
            }
            None => {}
        }

        let service = self.services.borrow().get(&key).cloned();
        match service {
            Some(Binding::Instance(obj)) => Ok(obj),
            Some(Binding::Factory(build)) => self.guarded(Frame::Service(key), || build(self)),
            None => Err(ContainerError::ServiceNotFound(name.to_string())),
        }
    }

    /// Like [`get`](Self::get), downcast to `T`.
    pub fn get_as<T: Any>(&self, name: &str) -> Result<Rc<T>, ContainerError> {
        self.get(name)?
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Whether `name` is bound as a singleton or a service.
    pub fn is_class_registered(&self, name: &str) -> bool {
        let key = normalize(name);
        self.instances.borrow().contains_key(&key) || self.services.borrow().contains_key(&key)
    }

    /// Adds a class to the catalog, replacing any definition with the same name.
    pub fn define(&self, class: ClassDef) {
        let key = normalize(class.name());
        tracing::trace!(class = %class.name(), "defining class");
        self.classes.borrow_mut().insert(key, Rc::new(class));
    }

    /// Whether `name` is in the class catalog.
    pub fn is_class_defined(&self, name: &str) -> bool {
        self.classes.borrow().contains_key(&normalize(name))
    }

    fn class(&self, name: &str) -> Result<Rc<ClassDef>, ContainerError> {
        self.classes
            .borrow()
            .get(&normalize(name))
            .cloned()
            .ok_or_else(|| ContainerError::ClassNotFound(name.to_string()))
    }

    /// Builds `class_name`, resolving each constructor parameter in turn.
    pub fn resolve(&self, class_name: &str, data: &ResolveData) -> Result<Instance, ContainerError> {
        let class = self.class(class_name)?;
        if !class.is_instantiable() {
            return Err(ContainerError::NotInstantiable(class_name.to_string()));
        }

        self.guarded(Frame::Class(normalize(class_name)), || {
            let args = self.resolve_params(class.params(), data)?;
            tracing::trace!(class = %class.name(), args = args.len(), "constructing class");
            class.construct(&args)
        })
    }

    /// Resolves a single parameter. The first step that matches wins:
    ///
    /// 1. an entry in `data` under the parameter name;
    /// 2. for class-typed parameters, an entry in `data` under the type name;
    /// 3. the registered binding for the type, or else the autowired type;
    /// 4. the declared default;
    /// 5. [`Arg::Null`].
    ///
    /// A class type that is abstract or not in the catalog falls through to
    /// step 4 instead of failing. A circular dependency is always an error.
    pub fn resolve_dependency(&self, param: &Param, data: &ResolveData) -> Result<Arg, ContainerError> {
        if let Some(arg) = data.get(param.name()) {
            return Ok(arg.clone());
        }

        if let Some(type_name) = param.ty().and_then(TypeRef::class_name) {
            if let Some(arg) = data.get(type_name) {
                return Ok(arg.clone());
            }

            if self.is_class_registered(type_name) {
                return self.get(type_name).map(Arg::Object);
            }

            match self.resolve(type_name, data) {
                Ok(obj) => return Ok(Arg::Object(obj)),
                Err(ContainerError::NotInstantiable(_)) | Err(ContainerError::ClassNotFound(_)) => {
                    tracing::debug!(
                        param = %param.name(),
                        ty = %type_name,
                        "dependency type cannot be built"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(default) = param.default_value() {
            return Ok(default.clone());
        }

        tracing::debug!(param = %param.name(), "unresolved dependency");
        Ok(Arg::Null)
    }

    fn resolve_params(&self, params: &[Param], data: &ResolveData) -> Result<Args, ContainerError> {
        let mut args = Args::new();
        for param in params {
            args.push(param.name(), self.resolve_dependency(param, data)?);
        }
        Ok(args)
    }

    /// Resolves the constructor arguments of `class_name`.
    ///
    /// Returns `None` for abstract classes and interfaces.
    pub fn get_constr_params(
        &self,
        class_name: &str,
        data: &ResolveData,
    ) -> Result<Option<Args>, ContainerError> {
        let class = self.class(class_name)?;
        if !class.is_instantiable() {
            return Ok(None);
        }
        self.resolve_params(class.params(), data).map(Some)
    }

    /// Resolves the parameters of a declared method, keyed by parameter name.
    pub fn resolve_method(
        &self,
        class_name: &str,
        method: &str,
        data: &ResolveData,
    ) -> Result<Args, ContainerError> {
        let class = self.class(class_name)?;
        let params = class
            .method_params(method)
            .ok_or_else(|| ContainerError::MethodNotFound {
                class: class_name.to_string(),
                method: method.to_string(),
            })?;
        self.resolve_params(params, data)
    }

    /// Registers services from declarative entries.
    ///
    /// Entries without a class are skipped. Numeric keys are replaced by the
    /// class name. Entries with `params` are built from those params; the
    /// rest are autowired with [`resolve`](Self::resolve). Construction is
    /// deferred until the service is first requested.
    pub fn load_from_config<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, ServiceEntry)>,
    {
        for (key, entry) in entries {
            let definition = match entry {
                ServiceEntry::Factory(build) => {
                    self.set(&key, Binding::Factory(build), false);
                    continue;
                }
                ServiceEntry::Class(class) => ServiceDefinition::new(class),
                ServiceEntry::Definition(definition) => definition,
            };

            if definition.class.is_empty() {
                tracing::debug!(name = %key, "skipping service definition without class");
                continue;
            }

            let name = if is_numeric(&key) {
                definition.class.clone()
            } else {
                key
            };
            let singleton = definition.singleton;

            let factory: Factory = Rc::new(move |container: &Container| match &definition.params {
                Some(params) if !params.is_empty() => {
                    container.construct_with(&definition.class, params)
                }
                _ => container.resolve(&definition.class, &ResolveData::new()),
            });
            self.set(&name, Binding::Factory(factory), singleton);
        }
    }

    /// Registers services from a configuration value: an object keyed by
    /// service name, or an array of entries.
    pub fn load_from_value(&self, config: &Value) -> Result<(), ContainerError> {
        let entries = match config {
            Value::Object(map) => map
                .iter()
                .map(|(key, value)| Ok((key.clone(), ServiceEntry::from_value(key, value)?)))
                .collect::<Result<Vec<_>, ContainerError>>()?,
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    let key = index.to_string();
                    let entry = ServiceEntry::from_value(&key, value)?;
                    Ok((key, entry))
                })
                .collect::<Result<Vec<_>, ContainerError>>()?,
            _ => {
                return Err(ContainerError::InvalidDefinition {
                    name: "services".to_string(),
                    source: serde::de::Error::custom("expected an object or array of services"),
                })
            }
        };

        self.load_from_config(entries);
        Ok(())
    }

    /// Resolves declared parameter values, keeping their order and names.
    pub fn get_class_params(&self, params: &[(String, ParamSpec)]) -> Result<Args, ContainerError> {
        let mut resolved = Args::new();
        for (name, spec) in params {
            let arg = match spec {
                ParamSpec::Literal(value) => Arg::Value(value.clone()),
                ParamSpec::Object(obj) => Arg::Object(Rc::clone(obj)),
                ParamSpec::Factory(build) => build(self)?,
                ParamSpec::Name(service) if self.is_class_registered(service) => {
                    Arg::Object(self.get(service)?)
                }
                ParamSpec::Name(literal) => Arg::Value(Value::String(literal.clone())),
            };
            resolved.push(name.clone(), arg);
        }
        Ok(resolved)
    }

    /// Builds a class from explicit params, matched to constructor params by
    /// name, then by position, then by default.
    fn construct_with(
        &self,
        class_name: &str,
        params: &[(String, ParamSpec)],
    ) -> Result<Instance, ContainerError> {
        let class = self.class(class_name)?;
        if !class.is_instantiable() {
            return Err(ContainerError::NotInstantiable(class_name.to_string()));
        }

        self.guarded(Frame::Class(normalize(class_name)), || {
            let provided = self.get_class_params(params)?;
            let mut args = Args::new();
            for (index, param) in class.params().iter().enumerate() {
                let arg = provided
                    .get(param.name())
                    .or_else(|| provided.get(&index.to_string()))
                    .or_else(|| param.default_value())
                    .cloned()
                    .unwrap_or(Arg::Null);
                args.push(param.name(), arg);
            }

            class.construct(&args)
        })
    }

    /// Drops every binding and class definition.
    pub fn clear(&self) {
        self.instances.borrow_mut().clear();
        self.services.borrow_mut().clear();
        self.classes.borrow_mut().clear();
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("instances", &self.instances.borrow().keys().collect::<Vec<_>>())
            .field("services", &self.services.borrow().keys().collect::<Vec<_>>())
            .field("classes", &self.classes.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
