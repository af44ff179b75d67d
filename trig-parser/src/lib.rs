//! # trig
//!
//! Compiler library for two small languages:
//!
//! - the *program* language, which declares triggers, functions, actions, presets and
//!   variables inside libraries, and imports host-provided entities by id;
//! - the *catalog* language, which arranges those definitions into libraries and folders
//!   for presentation.
//!
//! Both are lexed by a table-driven lexer and parsed by a backtracking grammar engine.
//! The parsed trees are assigned ids by the allocator, which also fills the two string
//! tables, and are finally merged by name and lowered into a generic intermediate tree.
//!
//! File Layout
//!
//! src/trig
//!   ├── lexing       Table-driven lexer
//!   ├── parsing      Grammar engine (rules, list sugar, backtracking matcher)
//!   ├── grammars     The program and catalog grammars built on the engine
//!   ├── allocation   Id allocation and string tables
//!   ├── building     Symbol resolution and intermediate tree lowering
//!   ├── cache        On-disk cache of the allocated program tree
//!   ├── formats      Tree markup writer/reader
//!   └── pipeline     Compiler driver tying the stages together

#![allow(rustdoc::invalid_html_tags)]

pub mod trig;
