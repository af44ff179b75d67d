//! Element ids and library namespaces

use crate::trig::error::CompileError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// The implicit library. Its entities carry no `Library` attribute in the output tree.
pub const DEFAULT_LIBRARY: &str = "0";

/// A per-library element id, rendered as 8 uppercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u32);

impl ElementId {
    pub fn new(raw: u32) -> Self {
        ElementId(raw)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError(pub String);

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` is not an 8 digit hex id", self.0)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for ElementId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 8 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseIdError(s.to_string()));
        }
        u32::from_str_radix(s, 16)
            .map(ElementId)
            .map_err(|_| ParseIdError(s.to_string()))
    }
}

/// Where an entity lives: its library namespace and its id there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Allocation {
    pub library: String,
    pub id: ElementId,
}

impl Allocation {
    pub fn new(library: impl Into<String>, id: ElementId) -> Self {
        Allocation {
            library: library.into(),
            id,
        }
    }

    pub fn is_default_library(&self) -> bool {
        self.library == DEFAULT_LIBRARY
    }

    /// The value of a `Library` attribute, `None` for the default library.
    pub fn library_attr(&self) -> Option<&str> {
        if self.is_default_library() {
            None
        } else {
            Some(&self.library)
        }
    }

    /// `<prefix><id>`, the last segment of a string-table key.
    pub fn string_key(&self) -> String {
        format!("{}{}", library_prefix(&self.library), self.id)
    }
}

/// `""` for the default library, `lib_<library>_` otherwise.
pub fn library_prefix(library: &str) -> String {
    if library == DEFAULT_LIBRARY {
        String::new()
    } else {
        format!("lib_{}_", library)
    }
}

/// Access to the `(library, id)` slot every definable node carries.
pub trait Allocatable {
    fn allocation(&self) -> Option<&Allocation>;

    fn slot(&mut self) -> &mut Option<Allocation>;

    /// The allocation of a node taken from an [`Allocated`] tree.
    fn allocated(&self) -> Result<&Allocation, CompileError> {
        self.allocation()
            .ok_or_else(|| CompileError::shape("node was lowered before it was allocated"))
    }
}

macro_rules! allocatable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::trig::ast::ids::Allocatable for $ty {
                fn allocation(&self) -> Option<&$crate::trig::ast::ids::Allocation> {
                    self.allocation.as_ref()
                }

                fn slot(&mut self) -> &mut Option<$crate::trig::ast::ids::Allocation> {
                    &mut self.allocation
                }
            }
        )*
    };
}

pub(crate) use allocatable;

/// A tree whose allocation pass has completed.
///
/// Constructed by the allocator and by cache deserialization only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocated<T>(T);

impl<T> Allocated<T> {
    pub(crate) fn new(inner: T) -> Self {
        Allocated(inner)
    }
}

impl<T> Deref for Allocated<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_is_padded_upper_hex() {
        assert_eq!(ElementId::new(0x1000_0001).to_string(), "10000001");
        assert_eq!(ElementId::new(0xab).to_string(), "000000AB");
    }

    #[test]
    fn test_id_parse() {
        assert_eq!("1000000A".parse(), Ok(ElementId::new(0x1000_000A)));
        assert!("1000".parse::<ElementId>().is_err());
        assert!("1000000G".parse::<ElementId>().is_err());
    }

    #[test]
    fn test_library_prefix() {
        assert_eq!(library_prefix("0"), "");
        assert_eq!(library_prefix("ABCD"), "lib_ABCD_");
        let allocation = Allocation::new("ABCD", ElementId::new(0x1000_0002));
        assert_eq!(allocation.string_key(), "lib_ABCD_10000002");
        assert_eq!(allocation.library_attr(), Some("ABCD"));
        assert_eq!(
            Allocation::new("0", ElementId::new(1)).library_attr(),
            None
        );
    }
}
