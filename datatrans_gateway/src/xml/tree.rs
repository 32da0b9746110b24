use std::str::from_utf8;

use quick_xml::{events::Event, Reader};

use crate::errors::ProtocolError;

/// A fully materialised XML element.
///
/// Datatrans documents are a few kilobytes at most, so they are read into a tree in one go and then queried, rather
/// than being parsed as a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    pub const fn empty() -> Self {
        Self { name: String::new(), attributes: Vec::new(), text: String::new(), children: Vec::new() }
    }

    pub fn parse(xml: &str) -> Result<Self, ProtocolError> {
        let mut reader = Reader::from_str(xml);
        // Whitespace inside text nodes is significant (e.g. `<errorMessage> CC-alias error,</errorMessage>`)
        reader.trim_text(false);
        reader.expand_empty_elements(true);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;
        loop {
            match reader.read_event().map_err(|e| xml_error(&reader, e))? {
                Event::Start(start) => {
                    let qname = start.name();
                    let name = from_utf8(qname.as_ref()).map_err(|e| ProtocolError::Xml(e.to_string()))?;
                    let mut element = XmlElement { name: name.to_string(), ..Default::default() };
                    for attr in start.attributes() {
                        let attr = attr.map_err(|e| ProtocolError::Xml(e.to_string()))?;
                        let key = from_utf8(attr.key.as_ref()).map_err(|e| ProtocolError::Xml(e.to_string()))?;
                        let value = attr.unescape_value().map_err(|e| ProtocolError::Xml(e.to_string()))?;
                        element.attributes.push((key.to_string(), value.into_owned()));
                    }
                    stack.push(element);
                },
                Event::Text(t) => {
                    if let Some(current) = stack.last_mut() {
                        let text = t.unescape().map_err(|e| ProtocolError::Xml(e.to_string()))?;
                        current.text.push_str(&text);
                    }
                },
                Event::CData(t) => {
                    if let Some(current) = stack.last_mut() {
                        let text = from_utf8(&t).map_err(|e| ProtocolError::Xml(e.to_string()))?;
                        current.text.push_str(text);
                    }
                },
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| ProtocolError::Xml("Unbalanced closing tag".into()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                },
                Event::Eof => break,
                // Declarations, comments, processing instructions and doctypes carry nothing we use
                _ => {},
            }
        }
        if !stack.is_empty() {
            return Err(ProtocolError::Xml(format!("Unexpected end of document inside <{}>", stack[0].name)));
        }
        root.ok_or_else(|| ProtocolError::Xml("The document has no root element".into()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn required_attr(&self, name: &str) -> Result<&str, ProtocolError> {
        self.attr(name)
            .ok_or_else(|| ProtocolError::MissingAttribute { element: self.name.clone(), attribute: name.to_string() })
    }

    /// The first direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn required_child(&self, name: &str) -> Result<&XmlElement, ProtocolError> {
        self.child(name).ok_or_else(|| ProtocolError::MissingElement(name.to_string()))
    }

    /// The text of the named child. Missing and empty elements are both `None`.
    pub fn optional_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str()).filter(|s| !s.is_empty())
    }

    pub fn optional_string(&self, name: &str) -> Option<String> {
        self.optional_text(name).map(String::from)
    }

    pub fn required_text(&self, name: &str) -> Result<&str, ProtocolError> {
        self.optional_text(name).ok_or_else(|| ProtocolError::MissingElement(name.to_string()))
    }

    /// The value of a `<parameter name="...">` child, as found under `userParameters`. Empty values are `None`.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.children
            .iter()
            .find(|c| c.name == "parameter" && c.attr("name") == Some(name))
            .map(|c| c.text.as_str())
            .filter(|s| !s.is_empty())
    }
}

fn xml_error(reader: &Reader<&[u8]>, e: quick_xml::Error) -> ProtocolError {
    ProtocolError::Xml(format!("{e} at position {}", reader.buffer_position()))
}
