use std::collections::BTreeMap;

use roxmltree::{Document, Node};
use serde_json::{Map, Value};

use super::driver::{configured_file, read_file, DriverKind, FormatDriver};
use super::{ConfigError, ConfigMap};

/// Key under which element attributes are collected.
pub const ATTRIBUTES_KEY: &str = "@attributes";

/// Collapses an XML document into a nested mapping.
///
/// The children of the root element become the top-level keys. Repeated
/// sibling elements become arrays, text-only elements become strings, and
/// empty elements become empty objects. Attributes are kept under
/// [`ATTRIBUTES_KEY`]; text next to attributes is stored under `"0"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDriver;

impl XmlDriver {
    pub(crate) fn boxed() -> Box<dyn FormatDriver> {
        Box::new(Self)
    }
}

impl FormatDriver for XmlDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Xml
    }

    fn extract(&self, settings: &ConfigMap) -> Result<ConfigMap, ConfigError> {
        let path = configured_file(settings, self.valid_file_types())?;
        let contents = read_file(&path)?;
        let doc = Document::parse(&contents).map_err(|e| ConfigError::XmlError {
            path: path.clone(),
            source: e,
        })?;

        match element_to_value(doc.root_element()) {
            Value::Object(map) => Ok(map),
            Value::String(text) => Ok(Map::from_iter([("0".to_string(), Value::String(text))])),
            _ => Err(ConfigError::NotAMapping(path)),
        }
    }
}

fn element_to_value(node: Node<'_, '_>) -> Value {
    let attributes: Map<String, Value> = node
        .attributes()
        .map(|attr| (attr.name().to_string(), Value::String(attr.value().to_string())))
        .collect();

    let mut children: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for child in node.children().filter(Node::is_element) {
        children
            .entry(child.tag_name().name().to_string())
            .or_default()
            .push(element_to_value(child));
    }

    let text: String = node
        .children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect();
    let has_text = !text.trim().is_empty();

    if children.is_empty() && attributes.is_empty() {
        return if has_text {
            Value::String(text)
        } else {
            Value::Object(Map::new())
        };
    }

    let mut map = Map::new();
    if !attributes.is_empty() {
        map.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
    }
    for (name, mut values) in children {
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        };
        map.insert(name, value);
    }
    // Mixed content keeps only elements.
    if map.len() == 1 && map.contains_key(ATTRIBUTES_KEY) && has_text {
        map.insert("0".to_string(), Value::String(text));
    }

    Value::Object(map)
}
