use super::{XmlError, XmlNode};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

struct OpenElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl OpenElement {
    fn from_start(start: &BytesStart) -> Result<Self, quick_xml::Error> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn into_node(self) -> XmlNode {
        XmlNode::Element {
            name: self.name,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<OpenElement>,
    root: Option<XmlNode>,
}

impl TreeBuilder {
    fn open(&mut self, element: OpenElement) {
        self.stack.push(element);
    }

    fn close(&mut self) {
        if let Some(element) = self.stack.pop() {
            self.attach(element.into_node());
        }
    }

    fn text(&mut self, text: String) {
        // Text outside the root element carries no data.
        if let Some(top) = self.stack.last_mut() {
            top.children.push(XmlNode::Text(text));
        }
    }

    fn attach(&mut self, node: XmlNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
        }
    }

    fn has_content(&self) -> bool {
        self.root.is_some() || !self.stack.is_empty()
    }

    /// Closes any element left open and returns the root.
    fn finish(mut self) -> Option<XmlNode> {
        while !self.stack.is_empty() {
            self.close();
        }
        self.root
    }
}

/// Parses an XML document into an [`XmlNode`] tree.
///
/// Parsing is best-effort: if the document breaks after the root element was
/// opened, the tree built so far is returned with every open element closed.
/// An error is only returned when nothing usable was parsed.
pub fn parse_xml(input: &str) -> Result<XmlNode, XmlError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut builder = TreeBuilder::default();

    loop {
        let step = match reader.read_event() {
            Ok(Event::Start(start)) => {
                OpenElement::from_start(&start).map(|element| builder.open(element))
            }
            Ok(Event::Empty(start)) => OpenElement::from_start(&start).map(|element| {
                builder.open(element);
                builder.close();
            }),
            Ok(Event::End(_)) => {
                builder.close();
                Ok(())
            }
            Ok(Event::Text(text)) => text.unescape().map(|text| {
                if !text.trim().is_empty() {
                    builder.text(text.into_owned());
                }
            }),
            Ok(Event::CData(data)) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                builder.text(text);
                Ok(())
            }
            Ok(Event::Eof) => break,
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };

        if let Err(e) = step {
            if builder.has_content() {
                debug!(
                    "XML parse error at position {}, keeping partial tree: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
            return Err(XmlError::Parse(e));
        }
    }

    builder.finish().ok_or(XmlError::NoRoot)
}
