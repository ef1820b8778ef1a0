//! Explicit constructor metadata used in place of runtime reflection.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::{Arg, Args, ContainerError, Instance};

/// Builds an instance from its resolved constructor arguments.
pub type Constructor = Rc<dyn Fn(&Args) -> Result<Instance, ContainerError>>;

/// The declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A primitive such as `string` or `int`. Never looked up in the container.
    Builtin(String),
    /// A class or interface name.
    Class(String),
}

impl TypeRef {
    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeRef::Class(name) => Some(name),
            TypeRef::Builtin(_) => None,
        }
    }
}

/// One constructor or method parameter.
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    ty: Option<TypeRef>,
    default: Option<Arg>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            default: None,
        }
    }

    pub fn typed(mut self, ty: TypeRef) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Shorthand for `typed(TypeRef::Class(name))`.
    pub fn class(self, name: impl Into<String>) -> Self {
        self.typed(TypeRef::Class(name.into()))
    }

    /// Shorthand for `typed(TypeRef::Builtin(name))`.
    pub fn builtin(self, name: impl Into<String>) -> Self {
        self.typed(TypeRef::Builtin(name.into()))
    }

    pub fn default(mut self, value: Arg) -> Self {
        self.default = Some(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> Option<&TypeRef> {
        self.ty.as_ref()
    }

    pub fn default_value(&self) -> Option<&Arg> {
        self.default.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Concrete,
    Abstract,
    Interface,
}

/// Describes a constructible type: its name, constructor parameters and
/// the methods whose parameters can be resolved.
///
/// ## Example
///
/// ```
/// use dragon_loader::container::{ClassDef, Param};
///
/// struct Mailer {
///     from: String,
/// }
///
/// let def = ClassDef::concrete("App\\Mailer", |args| {
///     Ok(Mailer {
///         from: args.str("from")?.to_string(),
///     })
/// })
/// .param(Param::new("from").builtin("string"));
///
/// assert_eq!(def.params().len(), 1);
/// ```
#[derive(Clone)]
pub struct ClassDef {
    name: String,
    kind: ClassKind,
    params: Vec<Param>,
    constructor: Option<Constructor>,
    methods: HashMap<String, Vec<Param>>,
}

impl ClassDef {
    pub fn concrete<T, F>(name: impl Into<String>, build: F) -> Self
    where
        T: Any,
        F: Fn(&Args) -> Result<T, ContainerError> + 'static,
    {
        let constructor: Constructor =
            Rc::new(move |args: &Args| -> Result<Instance, ContainerError> { Ok(Rc::new(build(args)?)) });
        Self::with_constructor(name, ClassKind::Concrete, Some(constructor))
    }

    /// A concrete class whose constructor already returns a shared instance.
    ///
    /// Use this to bind trait objects, e.g. by returning `Rc::new(Rc<dyn Trait>)`.
    pub fn concrete_instance<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(&Args) -> Result<Instance, ContainerError> + 'static,
    {
        Self::with_constructor(name, ClassKind::Concrete, Some(Rc::new(build)))
    }

    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self::with_constructor(name, ClassKind::Abstract, None)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_constructor(name, ClassKind::Interface, None)
    }

    fn with_constructor(
        name: impl Into<String>,
        kind: ClassKind,
        constructor: Option<Constructor>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            params: Vec::new(),
            constructor,
            methods: HashMap::new(),
        }
    }

    /// Appends a constructor parameter.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Declares a method and its parameters.
    pub fn method(mut self, name: impl Into<String>, params: Vec<Param>) -> Self {
        self.methods.insert(name.into(), params);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn is_instantiable(&self) -> bool {
        self.kind == ClassKind::Concrete && self.constructor.is_some()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn method_params(&self, method: &str) -> Option<&[Param]> {
        self.methods.get(method).map(Vec::as_slice)
    }

    pub(crate) fn construct(&self, args: &Args) -> Result<Instance, ContainerError> {
        match &self.constructor {
            Some(build) if self.kind == ClassKind::Concrete => build(args),
            _ => Err(ContainerError::NotInstantiable(self.name.clone())),
        }
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}
