//! The intermediate tree
//!
//! A generic tagged tree mirroring the host schema. Two node roles matter:
//!
//! - reference nodes: a kind tag plus `Type`, `Id` and, outside the default library,
//!   `Library`; no children
//! - `Element` nodes: `Type` and `Id` plus the full structural definition as children
//!
//! Attributes keep insertion order so the serialized document is stable.

use crate::trig::ast::{Allocation, ElementId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreeNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<TreeNode>,
    pub text: Option<String>,
}

impl TreeNode {
    pub fn new(tag: impl Into<String>) -> Self {
        TreeNode {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// `<tag Type=".." Id=".." Library=".."/>`, `Library` omitted for the default library.
    pub fn reference(tag: &str, ty: &str, target: &Allocation) -> Self {
        let node = TreeNode::new(tag)
            .attr("Type", ty)
            .attr("Id", target.id.to_string());
        match target.library_attr() {
            Some(library) => node.attr("Library", library),
            None => node,
        }
    }

    /// `<Element Type=".." Id="..">`
    pub fn element(ty: &str, id: ElementId) -> Self {
        TreeNode::new("Element")
            .attr("Type", ty)
            .attr("Id", id.to_string())
    }

    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn children_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a TreeNode> {
        self.children.iter().filter(move |child| child.tag == tag)
    }

    /// Every node below this one, depth first, parents before children.
    pub fn descendants(&self) -> Vec<&TreeNode> {
        let mut found = Vec::new();
        let mut stack: Vec<&TreeNode> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            found.push(node);
            stack.extend(node.children.iter().rev());
        }
        found
    }

    /// The `Element` of the given type and id, anywhere below this node.
    pub fn find_element(&self, ty: &str, id: &str) -> Option<&TreeNode> {
        self.descendants().into_iter().find(|node| {
            node.tag == "Element" && node.get_attr("Type") == Some(ty) && node.get_attr("Id") == Some(id)
        })
    }
}
