//! Testing utilities
//!
//!     Sample sources shared by unit and integration tests, and helpers that run the
//!     front of the pipeline on them.
//!
//! Use the samples
//!
//!     The program language has sharp edges: keywords match as literal prefixes (an
//!     identifier spelled `actions` lexes as `action` + `s`) and any eight hex digits lex
//!     as an id. An ad-hoc source string that trips over one of these tests the wrong
//!     thing. The samples below are known to parse; reach for them first and write a
//!     fresh source only when a test needs a shape none of them has.
//!
//! Samples
//!
//!     - [`samples::PRESET_PROGRAM`] / [`samples::PRESET_CATALOG`]: one preset, two members
//!     - [`samples::UNRESOLVED_PROGRAM`]: a trigger reading an undeclared variable
//!     - [`samples::BLOCK_PROGRAM`] / [`samples::BLOCK_CATALOG`]: a block passed to a
//!       `[block]` parameter
//!     - [`samples::FULL_PROGRAM`] / [`samples::FULL_CATALOG`]: two libraries, imports with
//!       defaults, arrays, text, presets and unlisted definitions

use crate::trig::allocation::Allocator;
use crate::trig::ast::{Allocated, Catalog, Program};
use crate::trig::building::{TreeBuilder, TreeNode};
use crate::trig::error::CompileError;
use crate::trig::grammars::{parse_catalog, parse_program, CATALOG_LEXER, PROGRAM_LEXER};

pub mod samples {
    pub const PRESET_PROGRAM: &str = r#"library "0" {
    preset Colors "Colors" { Red, Green }
}
"#;

    pub const PRESET_CATALOG: &str = r#"library "0" "Main" { Colors }
"#;

    pub const UNRESOLVED_PROGRAM: &str = r#"import "Ntve" {
    event MapInit = 00000001 ();
    action Wait = 00000002 (seconds: int = 00000003);
}
library "0" {
    trigger Boot "Boot" MapInit() {
        Wait(x);
    }
}
"#;

    pub const BLOCK_PROGRAM: &str = r#"import "Ntve" {
    event MapInit = 00000001 ();
    action Wait = 00000002 (seconds: int = 00000003);
}
library "0" {
    action Repeat "Repeat" (times: int, [block] body: code) { }
    trigger Boot "Boot" MapInit() {
        Repeat(3, {
            int step = 1;
            Wait(step);
            Wait(2);
            Wait(3);
        });
    }
}
"#;

    pub const BLOCK_CATALOG: &str = r#"library "0" "Main" {
    folder "Flow" { Boot, Repeat }
}
"#;

    pub const FULL_PROGRAM: &str = r#"// Shared host entities
import "Ntve" {
    preset Color { Red = 00000010, Blue = 00000011 }
    event MapInit = 00000001 ();
    action Wait = 00000002 (seconds: int = 00000003 (1));
    action Say = 00000004 (message: text = 00000005, tint: Color = 00000006 (Color.Red));
    function Add = 00000007 (a: int = 00000008, b: int = 00000009) -> int;
    int Difficulty = 0000000A;
}

library "0" {
    [comment="Shared counter"] int counter = 0;
    int[4] scores = 0;

    function Double "Double" (n: int) -> int { }

    action Greet "Greet" (who: string = "world") {
        Say(text"Hello", Color.Blue);
    }

    [disabled] trigger Boot "Boot" MapInit()
        int local = Add(counter, Difficulty);
    {
        Greet();
        Wait();
        Say(text"Ready");
        Wait(scores[local]);
    }
}

library "Quest" {
    preset Stage "Quest stage" { Start, Finish }
    trigger Advance "Advance" MapInit() {
        Greet("quest");
    }
}
"#;

    pub const FULL_CATALOG: &str = r#"library "0" "Main" {
    folder "Setup" { Boot, Greet },
    counter
}
library "Quest" "Quest" {
    folder "Flow" { Advance, Stage }
}
"#;
}

pub fn parse_program_source(source: &str) -> Result<Program, CompileError> {
    let tokens = PROGRAM_LEXER.tokenize(source)?;
    parse_program(&tokens, source.len())
}

pub fn parse_catalog_source(source: &str) -> Result<Catalog, CompileError> {
    let tokens = CATALOG_LEXER.tokenize(source)?;
    parse_catalog(&tokens, source.len())
}

/// Parse and allocate both sources with one allocator.
pub fn allocate(
    program: &str,
    catalog: &str,
) -> Result<(Allocated<Program>, Allocated<Catalog>, Allocator), CompileError> {
    let mut allocator = Allocator::new();
    let program = allocator.allocate_program(parse_program_source(program)?);
    let catalog = allocator.allocate_catalog(parse_catalog_source(catalog)?);
    Ok((program, catalog, allocator))
}

/// Parse, allocate and lower both sources.
pub fn build(program: &str, catalog: &str) -> Result<(TreeNode, Allocator), CompileError> {
    let (program, catalog, allocator) = allocate(program, catalog)?;
    let tree = TreeBuilder::new(&program, &catalog).build()?;
    Ok((tree, allocator))
}

/// Every `Element` of the given type below `tree`.
pub fn elements<'a>(tree: &'a TreeNode, ty: &str) -> Vec<&'a TreeNode> {
    tree.descendants()
        .into_iter()
        .filter(|node| node.tag == "Element" && node.get_attr("Type") == Some(ty))
        .collect()
}
