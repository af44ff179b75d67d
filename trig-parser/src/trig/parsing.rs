//! Grammar engine
//!
//! A generic backtracking parser driven by a flat rule table:
//!
//! - [`builder`]: builds the table; list sugar expands into hidden right-recursive rules
//! - [`engine`]: matches every alternative at every length and reports the furthest failure
//! - [`semantic`]: the contract between the engine and a grammar's value type
//!
//! Grammars in [`crate::trig::grammars`] are built on this module.

pub mod builder;
pub mod engine;
pub mod semantic;

pub use builder::GrammarBuilder;
pub use engine::{Alternative, Grammar, Symbol};
pub use semantic::{Args, ReduceError, SemanticValue};
