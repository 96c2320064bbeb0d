//! Namespace injection.
//!
//! Copies values from a plain payload into the qualified key layout of a
//! template. Missing data is omitted, never replaced by placeholders.

use crate::template::{bare_name, Template};
use serde_json::{Map, Value};

/// Rebuild `payload` under the qualified keys of `template`.
///
/// - Template keys are visited in template order; a key whose bare name is
///   absent from the payload, or maps to `null`, is skipped.
/// - A payload array against a list template maps every item through the
///   list's element template. Against any other template it yields an empty
///   array.
/// - A payload object recurses into the key's template (the element template
///   when the key is a list).
/// - Scalars are copied verbatim.
///
/// A template that is not a node, or a payload that is not an object, yields
/// an empty map. This function never fails.
pub fn inject_namespace(template: &Template, payload: &Value) -> Map<String, Value> {
    let mut result = Map::new();

    let (Some(fields), Value::Object(payload)) = (template.fields(), payload) else {
        return result;
    };

    for (key, shape) in fields {
        let value = match payload.get(bare_name(key)) {
            None | Some(Value::Null) => continue,
            Some(value) => value,
        };

        let injected = match value {
            Value::Array(items) => Value::Array(inject_list(shape, items)),
            Value::Object(_) => Value::Object(inject_namespace(shape.element(), value)),
            scalar => scalar.clone(),
        };
        result.insert(key.clone(), injected);
    }

    result
}

fn inject_list(shape: &Template, items: &[Value]) -> Vec<Value> {
    match shape {
        Template::List(element) => items
            .iter()
            .map(|item| Value::Object(inject_namespace(element, item)))
            .collect(),
        _ => Vec::new(),
    }
}
