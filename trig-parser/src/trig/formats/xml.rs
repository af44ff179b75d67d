//! XML tree markup
//!
//! Each [`TreeNode`] becomes one XML element with the node's tag, its attributes in
//! insertion order and either its text or its children. Nodes with neither self-close.
//! Reading accepts any document written this way (whitespace between elements is
//! ignored) and rebuilds the same tree.

use super::{FormatError, TreeFormat};
use crate::trig::building::TreeNode;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlFormat {
    /// Start the document with `<?xml version="1.0" encoding="utf-8"?>`
    pub declaration: bool,
}

impl Default for XmlFormat {
    fn default() -> Self {
        XmlFormat { declaration: true }
    }
}

impl XmlFormat {
    pub fn new(declaration: bool) -> Self {
        XmlFormat { declaration }
    }
}

impl TreeFormat for XmlFormat {
    fn name(&self) -> &str {
        "xml"
    }

    fn serialize(&self, tree: &TreeNode) -> Result<String, FormatError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        if self.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
                .map_err(write_error)?;
        }
        write_node(&mut writer, tree)?;
        String::from_utf8(writer.into_inner()).map_err(write_error)
    }

    fn parse(&self, source: &str) -> Result<TreeNode, FormatError> {
        read_tree(source)
    }
}

fn write_error(err: impl fmt::Display) -> FormatError {
    FormatError::Serialize(err.to_string())
}

fn read_error(err: impl fmt::Display) -> FormatError {
    FormatError::Parse(err.to_string())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &TreeNode) -> Result<(), FormatError> {
    let start = BytesStart::new(node.tag.as_str()).with_attributes(
        node.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str())),
    );

    if node.children.is_empty() && node.text.is_none() {
        return writer.write_event(Event::Empty(start)).map_err(write_error);
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    if let Some(text) = &node.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_error)?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.tag.as_str())))
        .map_err(write_error)
}

fn open_node(start: &BytesStart<'_>) -> Result<TreeNode, FormatError> {
    let mut node = TreeNode::new(String::from_utf8_lossy(start.name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute.map_err(read_error)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(read_error)?.into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

/// Read a document written by [`XmlFormat`] back into a tree.
pub fn read_tree(source: &str) -> Result<TreeNode, FormatError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<TreeNode> = Vec::new();
    let mut root = None;
    loop {
        let finished = match reader.read_event().map_err(read_error)? {
            Event::Start(start) => {
                stack.push(open_node(&start)?);
                None
            }
            Event::Empty(start) => Some(open_node(&start)?),
            Event::Text(text) => {
                let text = text.unescape().map_err(read_error)?;
                match stack.last_mut() {
                    Some(node) => node.text = Some(text.into_owned()),
                    None => return Err(FormatError::Parse("text outside the root".to_string())),
                }
                None
            }
            Event::End(_) => stack.pop(),
            Event::Eof => break,
            _ => None,
        };

        if let Some(node) = finished {
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None if root.is_none() => root = Some(node),
                None => return Err(FormatError::Parse("more than one root".to_string())),
            }
        }
    }

    if !stack.is_empty() {
        return Err(FormatError::Parse("unclosed element".to_string()));
    }
    root.ok_or_else(|| FormatError::Parse("empty document".to_string()))
}
