//! Namespace templates.
//!
//! A template mirrors the request element of a SOAP template file. Keys are
//! qualified element names (`prefix:Local`); the local part is the lookup key
//! into the caller's payload.

use crate::xml::XmlElement;
use indexmap::IndexMap;
use serde_json::Value;

/// Shape of one template position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Template {
    /// Placeholder for a scalar (or any payload value without structure)
    #[default]
    Leaf,
    /// Nested element with qualified child keys, in document order
    Node(IndexMap<String, Template>),
    /// Repeating element; the sub-template applies to every list item
    List(Box<Template>),
}

impl Template {
    /// Build a template from its JSON form: `{}` is a leaf, an object is a
    /// node and `[sub]` is a list of `sub`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) if map.is_empty() => Self::Leaf,
            Value::Object(map) => Self::Node(
                map.iter()
                    .map(|(key, child)| (key.clone(), Self::from_json(child)))
                    .collect(),
            ),
            Value::Array(items) => Self::List(Box::new(
                items.first().map(Self::from_json).unwrap_or_default(),
            )),
            _ => Self::Leaf,
        }
    }

    /// Build a template from an element's children.
    ///
    /// A child that repeats among its siblings, or that the template file
    /// marks as repeating, becomes a list. The first occurrence defines the
    /// sub-template.
    pub fn from_element(element: &XmlElement) -> Self {
        if element.children.is_empty() {
            return Self::Leaf;
        }

        let mut fields: IndexMap<String, Template> = IndexMap::new();
        for child in &element.children {
            match fields.get_mut(&child.name) {
                Some(existing) => {
                    if !existing.is_list() {
                        let first = std::mem::take(existing);
                        *existing = Self::List(Box::new(first));
                    }
                }
                None => {
                    let shape = Self::from_element(child);
                    let shape = if child.repeatable {
                        Self::List(Box::new(shape))
                    } else {
                        shape
                    };
                    fields.insert(child.name.clone(), shape);
                }
            }
        }

        Self::Node(fields)
    }

    /// Child keys of a node; `None` for leaves and lists.
    pub fn fields(&self) -> Option<&IndexMap<String, Template>> {
        match self {
            Self::Node(fields) => Some(fields),
            _ => None,
        }
    }

    /// Template applied to a single payload object: the element template of a
    /// list, or the template itself.
    pub fn element(&self) -> &Template {
        match self {
            Self::List(inner) => inner,
            other => other,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

/// Payload key for a qualified template key: the part after the first `:`,
/// or the whole key when it carries no prefix.
pub fn bare_name(key: &str) -> &str {
    key.split_once(':').map_or(key, |(_, name)| name)
}
