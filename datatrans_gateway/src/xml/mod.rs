mod tree;
mod writer;

pub use tree::XmlElement;
pub use writer::XmlDocument;
