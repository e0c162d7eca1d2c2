//! XML handling for the public data API.
//!
//! Responses are parsed into a small tagged tree ([`XmlNode`]) and then
//! flattened into a JSON-like value tree where repeated tags become arrays and
//! text leaves are wrapped as `{"#text": value}`. [`raise_value`] unwraps those
//! leaves so typed decoding can read plain strings.

mod json;
mod parser;

pub use json::{document_to_json, raise_value, xml_to_json, ATTRIBUTES_KEY, TEXT_KEY};
pub use parser::parse_xml;

use thiserror::Error;

/// A parsed XML node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<XmlNode>,
    },
    Text(String),
}

impl XmlNode {
    /// Tag name for elements, `None` for text nodes.
    pub fn name(&self) -> Option<&str> {
        match self {
            XmlNode::Element { name, .. } => Some(name),
            XmlNode::Text(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML parse error: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("XML document has no root element")]
    NoRoot,
}
