//! Building the host tree from allocated trees
//!
//! The builder walks the allocated catalog and program and lowers them into a generic
//! tagged tree ([`TreeNode`]) mirroring the host's trigger document. Serialization of that
//! tree lives in [`crate::trig::formats`].
//!
//! - `symbols` - the global name dictionaries
//! - `scope` - name resolution inside one definition
//! - `lowering` - definitions, values and calls to `Element` nodes
//! - `generator` - assembling libraries into the `TriggerData` document

pub mod generator;
pub mod lowering;
pub mod scope;
pub mod symbols;
pub mod tree;

pub use generator::TreeBuilder;
pub use lowering::{LibraryOutput, Lowerer, MAX_DEPTH};
pub use scope::{Binding, ScopeContext};
pub use symbols::SymbolTable;
pub use tree::TreeNode;
