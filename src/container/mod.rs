//! Name-keyed service container with constructor autowiring.
//!
//! Constructor parameters are declared up front with [`ClassDef`] and
//! resolved on demand by the [`Container`].

mod args;
mod class;
mod definition;
mod error;
mod registry;

pub use args::{Arg, Args};
pub use class::{ClassDef, ClassKind, Constructor, Param, TypeRef};
pub use definition::{ParamFactory, ParamSpec, ServiceDefinition, ServiceEntry, LITERAL_MARKER};
pub use error::ContainerError;
pub use registry::{Binding, Container, Factory, ResolveData};

/// A live object held by the container.
pub type Instance = std::rc::Rc<dyn std::any::Any>;
