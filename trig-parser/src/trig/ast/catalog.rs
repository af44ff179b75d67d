//! Catalog-language nodes
//!
//! Leaves are bare names resolved later against the program's definitions; folders become
//! `Category` elements.

use super::ids::{allocatable, Allocation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub libraries: Vec<CatalogLibrary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogLibrary {
    pub name: String,
    pub description: String,
    pub items: Vec<CatalogItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogItem {
    Leaf(String),
    Folder(Folder),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub description: String,
    pub items: Vec<CatalogItem>,
    pub allocation: Option<Allocation>,
}

allocatable!(Folder);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trig::ast::{Allocatable, ElementId};

    #[test]
    fn test_folder_slot_is_filled_through_the_trait() {
        let mut folder = Folder {
            description: "Setup".to_string(),
            items: vec![CatalogItem::Leaf("Boot".to_string())],
            allocation: None,
        };
        assert!(folder.allocated().is_err());

        *folder.slot() = Some(Allocation::new("0", ElementId::new(0x1000_0001)));
        assert_eq!(folder.allocated().unwrap().id.to_string(), "10000001");
    }
}
