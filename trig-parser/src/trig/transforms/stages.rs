//! Individual transformation stages

use super::Runnable;
use crate::trig::ast::{Catalog, Program};
use crate::trig::error::CompileError;
use crate::trig::grammars::{parse_catalog, parse_program};
use crate::trig::lexing::LexerSpec;
use crate::trig::token::Token;

/// Tokens of one source plus the source length, which parse errors at the end of input
/// report as their offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub source_len: usize,
}

/// String -> [`Lexed`] with a fixed lexer
pub struct Tokenize {
    lexer: &'static LexerSpec,
}

impl Tokenize {
    pub fn new(lexer: &'static LexerSpec) -> Self {
        Tokenize { lexer }
    }
}

impl Runnable<String, Lexed> for Tokenize {
    fn run(&self, source: String) -> Result<Lexed, CompileError> {
        Ok(Lexed {
            tokens: self.lexer.tokenize(&source)?,
            source_len: source.len(),
        })
    }
}

pub struct ParseProgram;

impl Runnable<Lexed, Program> for ParseProgram {
    fn run(&self, lexed: Lexed) -> Result<Program, CompileError> {
        parse_program(&lexed.tokens, lexed.source_len)
    }
}

pub struct ParseCatalog;

impl Runnable<Lexed, Catalog> for ParseCatalog {
    fn run(&self, lexed: Lexed) -> Result<Catalog, CompileError> {
        parse_catalog(&lexed.tokens, lexed.source_len)
    }
}
