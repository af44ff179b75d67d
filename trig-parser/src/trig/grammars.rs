//! The two languages, built on the lexer and the grammar engine
//!
//! Each language exposes a static lexer configuration, a static rule table and a parse
//! function turning a token stream into its AST:
//!
//! - [`program`]: imports, libraries and their definitions
//! - [`catalog`]: libraries, folders and leaf names
//!
//! Rule tables are built once on first use and shared read-only afterwards.

pub mod catalog;
pub mod program;

pub use catalog::{parse_catalog, CatalogSyntax, CATALOG_GRAMMAR, CATALOG_LEXER};
pub use program::{parse_program, ProgramSyntax, PROGRAM_GRAMMAR, PROGRAM_LEXER};

use crate::trig::lexing::{parse_bool, parse_int, strip_quotes, LexerSpec};

/// Whitespace and `//` line comments
pub const IGNORE: &str = r"([ \t\r\n]+|//[^\n]*)+";

pub(crate) const STR: &str = r#""[^"]*""#;
pub(crate) const LABEL: &str = r"[\p{L}_][\p{L}\p{N}_]*";

/// Attach the transforms shared by both languages.
pub(crate) fn common_transforms(spec: LexerSpec) -> LexerSpec {
    spec.transform("str", strip_quotes)
        .transform("text", strip_quotes)
        .transform("int", parse_int)
        .transform("bool", parse_bool)
}
