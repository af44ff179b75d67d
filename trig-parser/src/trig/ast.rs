//! AST definitions for both languages
//!
//!     The program language describes logic: libraries of presets, global variables,
//!     functions, actions and triggers, plus import scopes declaring entities that live in
//!     a host library under known ids. The catalog language only orders and groups those
//!     definitions for presentation.
//!
//! Allocation
//!
//!     Every definable node carries `allocation: Option<Allocation>`. Parsing leaves it
//!     unset; the allocator fills it exactly once and hands the tree back wrapped in
//!     [`Allocated`]. Only the allocator (and the cache, which stores allocated trees) can
//!     produce an `Allocated` value, and the tree builder only accepts `Allocated` trees,
//!     so "allocate once, then read only" is carried by the types.
//!
//!     Parse results are plain owned values. Speculative parser branches each receive
//!     their own clone, so no two branches can observe each other's allocation.
//!
//! ## Modules
//!
//! - `ids` - element ids, library names and the [`Allocatable`] contract
//! - `program` - program-language nodes
//! - `catalog` - catalog-language nodes

pub mod catalog;
pub mod ids;
pub mod program;

pub use catalog::{Catalog, CatalogItem, CatalogLibrary, Folder};
pub use ids::{
    library_prefix, Allocatable, Allocated, Allocation, ElementId, ParseIdError, DEFAULT_LIBRARY,
};
pub use program::{
    ArrayDim, Attribute, Block, Call, CallableKind, Definition, ExternalDefinition,
    ExternalFunction, ExternalParam, ExternalPreset, ExternalPresetMember, ExternalVariable,
    FunctionDef, ImportScope, LibraryScope, ParamDef, PresetDef, PresetMember, Program, Scope,
    TriggerDef, TypeRef, Value, ValueKind, VariableDef,
};
