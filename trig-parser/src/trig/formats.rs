//! Serialized forms of the intermediate tree
//!
//! A format converts a [`TreeNode`] document to text and back. The host reads the tree as
//! XML, so [`xml::XmlFormat`] is the one the pipeline writes.

pub mod xml;

pub use xml::XmlFormat;

use crate::trig::building::TreeNode;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The writer failed
    Serialize(String),
    /// The input is not a well-formed document of this format
    Parse(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::Serialize(msg) => write!(f, "Serialization error: {}", msg),
            FormatError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for FormatError {}

pub trait TreeFormat: Send + Sync {
    /// The name of this format (e.g. "xml")
    fn name(&self) -> &str;

    fn serialize(&self, tree: &TreeNode) -> Result<String, FormatError>;

    fn parse(&self, source: &str) -> Result<TreeNode, FormatError>;
}
