use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use crate::errors::ProtocolError;

/// Builds a compact XML document: a UTF-8 declaration followed by the elements, with no whitespace in between.
pub struct XmlDocument {
    writer: Writer<Vec<u8>>,
}

impl XmlDocument {
    pub fn new() -> Result<Self, ProtocolError> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| ProtocolError::Xml(e.to_string()))?;
        Ok(Self { writer })
    }

    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<&mut Self, ProtocolError> {
        let mut elem = BytesStart::new(name);
        for (key, value) in attrs {
            elem.push_attribute((*key, *value));
        }
        self.writer.write_event(Event::Start(elem)).map_err(|e| ProtocolError::Xml(e.to_string()))?;
        Ok(self)
    }

    pub fn end(&mut self, name: &str) -> Result<&mut Self, ProtocolError> {
        self.writer.write_event(Event::End(BytesEnd::new(name))).map_err(|e| ProtocolError::Xml(e.to_string()))?;
        Ok(self)
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, ProtocolError> {
        self.start(name, &[])?;
        self.writer.write_event(Event::Text(BytesText::new(text))).map_err(|e| ProtocolError::Xml(e.to_string()))?;
        self.end(name)
    }

    pub fn finish(self) -> Result<String, ProtocolError> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| ProtocolError::Xml(e.to_string()))
    }
}
