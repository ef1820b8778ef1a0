use std::any::{type_name, Any};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::{ContainerError, Instance};

/// A value flowing through dependency resolution.
#[derive(Clone)]
pub enum Arg {
    /// A live object, usually taken from the container.
    Object(Instance),
    /// A plain configuration value.
    Value(Value),
    /// Nothing could be resolved.
    Null,
}

impl Arg {
    pub fn object<T: Any>(value: T) -> Self {
        Arg::Object(Rc::new(value))
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Arg::Value(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Arg::Null)
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Arg::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the object as `T` if it is one.
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        self.as_object().and_then(|obj| Rc::clone(obj).downcast::<T>().ok())
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<Instance> for Arg {
    fn from(obj: Instance) -> Self {
        Arg::Object(obj)
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Object(_) => f.write_str("Object(..)"),
            Arg::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Arg::Null => f.write_str("Null"),
        }
    }
}

/// Resolved arguments, ordered as declared and addressable by name.
#[derive(Debug, Clone, Default)]
pub struct Args {
    entries: Vec<(String, Arg)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, arg: Arg) {
        self.entries.push((name.into(), arg));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, arg)| arg)
    }

    pub fn at(&self, index: usize) -> Option<&Arg> {
        self.entries.get(index).map(|(_, arg)| arg)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.entries.iter().map(|(name, arg)| (name.as_str(), arg))
    }

    /// Returns a required object argument as `T`.
    ///
    /// A dependency that resolved to [`Arg::Null`] surfaces here as
    /// [`ContainerError::MissingArgument`].
    pub fn object<T: Any>(&self, name: &str) -> Result<Rc<T>, ContainerError> {
        match self.get(name) {
            None | Some(Arg::Null) => Err(ContainerError::MissingArgument(name.to_string())),
            Some(arg) => arg.downcast::<T>().ok_or_else(|| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            }),
        }
    }

    /// Returns an optional object argument; `Null` and absent both yield `None`.
    pub fn optional_object<T: Any>(&self, name: &str) -> Result<Option<Rc<T>>, ContainerError> {
        match self.get(name) {
            None | Some(Arg::Null) => Ok(None),
            Some(_) => self.object(name).map(Some),
        }
    }

    pub fn value(&self, name: &str) -> Result<&Value, ContainerError> {
        match self.get(name) {
            Some(Arg::Value(value)) => Ok(value),
            Some(Arg::Object(_)) => Err(ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: "value",
            }),
            None | Some(Arg::Null) => Err(ContainerError::MissingArgument(name.to_string())),
        }
    }

    pub fn str(&self, name: &str) -> Result<&str, ContainerError> {
        self.value(name)?
            .as_str()
            .ok_or_else(|| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: "string",
            })
    }
}

impl IntoIterator for Args {
    type Item = (String, Arg);
    type IntoIter = std::vec::IntoIter<(String, Arg)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Arg)> for Args {
    fn from_iter<I: IntoIterator<Item = (String, Arg)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Clock(u32);

    fn sample() -> Args {
        let mut args = Args::new();
        args.push("clock", Arg::object(Clock(7)));
        args.push("name", Arg::value("dragon"));
        args.push("missing", Arg::Null);
        args
    }

    #[test]
    fn test_lookup_by_name_and_position() {
        let args = sample();
        assert_eq!(args.len(), 3);
        assert!(args.at(2).unwrap().is_null());
        assert_eq!(args.get("name").unwrap().as_value(), Some(&json!("dragon")));
        assert_eq!(args.names().collect::<Vec<_>>(), ["clock", "name", "missing"]);
    }

    #[test]
    fn test_typed_object_access() {
        let args = sample();
        assert_eq!(*args.object::<Clock>("clock").unwrap(), Clock(7));
        assert!(matches!(
            args.object::<String>("clock"),
            Err(ContainerError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_null_surfaces_as_missing_argument() {
        let args = sample();
        let err = args.object::<Clock>("missing").unwrap_err();
        assert!(matches!(err, ContainerError::MissingArgument(ref n) if n == "missing"));
        assert!(args.optional_object::<Clock>("missing").unwrap().is_none());
        assert!(args.optional_object::<Clock>("absent").unwrap().is_none());
    }

    #[test]
    fn test_value_access() {
        let args = sample();
        assert_eq!(args.str("name").unwrap(), "dragon");
        assert!(matches!(args.value("clock"), Err(ContainerError::TypeMismatch { .. })));
        assert!(matches!(args.value("missing"), Err(ContainerError::MissingArgument(_))));
    }
}
