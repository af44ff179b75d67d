//! Standard transform definitions
//!
//! Pre-built chains for both languages, built once as `once_cell::sync::Lazy` statics.

use super::stages::{Lexed, ParseCatalog, ParseProgram, Tokenize};
use super::Transform;
use crate::trig::ast::{Catalog, Program};
use crate::trig::grammars::{CATALOG_LEXER, PROGRAM_LEXER};
use once_cell::sync::Lazy;

pub type LexingTransform = Transform<String, Lexed>;

/// Program source -> tokens
pub static PROGRAM_LEXING: Lazy<LexingTransform> =
    Lazy::new(|| Transform::from_fn(Ok).then(Tokenize::new(&PROGRAM_LEXER)));

/// Program source -> unallocated program tree
pub static PROGRAM_TO_AST: Lazy<Transform<String, Program>> =
    Lazy::new(|| Transform::from_fn(Ok).then_transform(&PROGRAM_LEXING).then(ParseProgram));

/// Catalog source -> tokens
pub static CATALOG_LEXING: Lazy<LexingTransform> =
    Lazy::new(|| Transform::from_fn(Ok).then(Tokenize::new(&CATALOG_LEXER)));

/// Catalog source -> unallocated catalog tree
pub static CATALOG_TO_AST: Lazy<Transform<String, Catalog>> =
    Lazy::new(|| Transform::from_fn(Ok).then_transform(&CATALOG_LEXING).then(ParseCatalog));
