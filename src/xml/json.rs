use super::XmlNode;
use serde_json::{Map, Value};

/// Key under which element attributes are collected.
pub const ATTRIBUTES_KEY: &str = "@attributes";
/// Key under which text children are collected.
pub const TEXT_KEY: &str = "#text";

/// Converts a node into a JSON tree.
///
/// Elements become objects keyed by child tag name (`#text` for text
/// children). A key seen more than once turns into an array in document order.
pub fn xml_to_json(node: &XmlNode) -> Value {
    match node {
        XmlNode::Text(text) => Value::String(text.clone()),
        XmlNode::Element {
            attributes,
            children,
            ..
        } => {
            let mut object = Map::new();

            if !attributes.is_empty() {
                let attributes = attributes
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                    .collect();
                object.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
            }

            for child in children {
                let key = child.name().unwrap_or(TEXT_KEY).to_string();
                let value = xml_to_json(child);
                match object.get_mut(&key) {
                    None => {
                        object.insert(key, value);
                    }
                    Some(Value::Array(values)) => values.push(value),
                    Some(existing) => {
                        let first = existing.take();
                        *existing = Value::Array(vec![first, value]);
                    }
                }
            }

            Value::Object(object)
        }
    }
}

/// Like [`xml_to_json`] but keeps the root tag as the single top-level key,
/// so `<response>..</response>` is addressed as `response.body...`.
pub fn document_to_json(root: &XmlNode) -> Value {
    let mut object = Map::new();
    let name = root.name().unwrap_or(TEXT_KEY).to_string();
    object.insert(name, xml_to_json(root));
    Value::Object(object)
}

/// Replaces every object that carries a `#text` key by that key's value.
pub fn raise_value(value: Value) -> Value {
    match value {
        Value::Object(mut object) => match object.remove(TEXT_KEY) {
            Some(text) => raise_value(text),
            None => Value::Object(
                object
                    .into_iter()
                    .map(|(key, value)| (key, raise_value(value)))
                    .collect(),
            ),
        },
        Value::Array(values) => Value::Array(values.into_iter().map(raise_value).collect()),
        other => other,
    }
}
