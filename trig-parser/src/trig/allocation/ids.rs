//! Per-library id counters

use crate::trig::ast::{Allocation, ElementId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every library counter starts here; the first id handed out is `10000001`.
pub const ID_BASE: u32 = 0x1000_0000;

/// One counter per library. Shared by every tree allocated in one run so that ids never
/// repeat across the program and the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    counters: BTreeMap<String, u32>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, library: &str) -> ElementId {
        let counter = self
            .counters
            .entry(library.to_string())
            .or_insert(ID_BASE);
        *counter += 1;
        ElementId::new(*counter)
    }

    pub fn allocate(&mut self, library: &str) -> Allocation {
        Allocation::new(library, self.next(library))
    }

    /// The most recent id issued in `library`.
    pub fn last(&self, library: &str) -> Option<ElementId> {
        self.counters.get(library).map(|counter| ElementId::new(*counter))
    }

    /// Total ids issued across every library.
    pub fn issued(&self) -> u32 {
        self.counters.values().map(|counter| counter - ID_BASE).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_per_library() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next("0").to_string(), "10000001");
        assert_eq!(ids.next("0").to_string(), "10000002");
        assert_eq!(ids.next("Lib").to_string(), "10000001");
        assert_eq!(ids.last("0"), Some(ElementId::new(0x1000_0002)));
        assert_eq!(ids.last("none"), None);
        assert_eq!(ids.issued(), 3);
    }
}
