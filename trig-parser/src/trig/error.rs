//! Error types for the compiler
//!
//! Every stage returns structured errors; nothing here is logged. A driver formats them,
//! optionally with [`format_source_context`] for errors that carry a source offset.

use std::collections::BTreeSet;
use std::fmt;

/// No keyword or token pattern matched at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub offset: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to lex around offset {}", self.offset)
    }
}

impl std::error::Error for LexError {}

/// No parse of the whole token stream exists.
///
/// `offset` is the furthest source position at which a terminal comparison failed,
/// `found` the token name seen there and `expected` every terminal that would have
/// matched at that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub offset: usize,
    pub found: String,
    pub found_text: String,
    pub expected: BTreeSet<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected: Vec<&str> = self.expected.iter().map(String::as_str).collect();
        write!(
            f,
            "Parse failed at offset {}: found {}",
            self.offset, self.found
        )?;
        if !self.found_text.is_empty() && self.found_text != self.found {
            write!(f, " `{}`", self.found_text)?;
        }
        write!(f, ", expected one of: {}", expected.join(", "))
    }
}

impl std::error::Error for ParseError {}

/// A grammar that cannot be built or a reducer that received values it did not expect.
///
/// Both indicate a bug in a grammar definition rather than in the parsed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// A rule references a nonterminal with no alternatives
    UnknownRule(String),
    /// A reducer rejected the values matched by its alternative
    Reduce { rule: String, message: String },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::UnknownRule(name) => write!(f, "Unknown grammar rule `{}`", name),
            GrammarError::Reduce { rule, message } => {
                write!(f, "Reducer for `{}` failed: {}", rule, message)
            }
        }
    }
}

impl std::error::Error for GrammarError {}

/// Every way a compile run can fail. The first error aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    Lex(LexError),
    Parse(ParseError),
    Grammar(GrammarError),
    /// A variable, parameter, preset, preset member or callee name with no definition in scope
    UnresolvedSymbol { name: String },
    /// A catalog leaf that names no known definition
    UnknownDefinition { name: String },
    /// Block/non-block mismatch, bad argument counts or a malformed attribute
    Shape { message: String },
}

impl CompileError {
    pub fn unresolved(name: impl Into<String>) -> Self {
        CompileError::UnresolvedSymbol { name: name.into() }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        CompileError::Shape {
            message: message.into(),
        }
    }

    /// Source offset for errors raised before a tree exists.
    pub fn offset(&self) -> Option<usize> {
        match self {
            CompileError::Lex(err) => Some(err.offset),
            CompileError::Parse(err) => Some(err.offset),
            _ => None,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lex(err) => write!(f, "{}", err),
            CompileError::Parse(err) => write!(f, "{}", err),
            CompileError::Grammar(err) => write!(f, "{}", err),
            CompileError::UnresolvedSymbol { name } => write!(f, "Unresolved symbol `{}`", name),
            CompileError::UnknownDefinition { name } => {
                write!(f, "Catalog entry `{}` matches no known definition", name)
            }
            CompileError::Shape { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(err: LexError) -> Self {
        CompileError::Lex(err)
    }
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        CompileError::Parse(err)
    }
}

impl From<GrammarError> for CompileError {
    fn from(err: GrammarError) -> Self {
        CompileError::Grammar(err)
    }
}

/// Format source code context around a byte offset
///
/// Shows 2 lines before the offending line, the line itself with a >> marker, and 2 lines
/// after. All lines are numbered (1-indexed).
pub fn format_source_context(source: &str, offset: usize) -> String {
    let offset = offset.min(source.len());
    let error_line = source
        .char_indices()
        .take_while(|(index, _)| *index < offset)
        .filter(|(_, ch)| *ch == '\n')
        .count();
    let lines: Vec<&str> = source.lines().collect();

    let start_line = error_line.saturating_sub(2);
    let end_line = (error_line + 3).min(lines.len());

    let mut context = String::new();
    for (line_num, line) in lines
        .iter()
        .enumerate()
        .take(end_line)
        .skip(start_line)
    {
        let marker = if line_num == error_line { ">>" } else { "  " };
        context.push_str(&format!("{} {:3} | {}\n", marker, line_num + 1, line));
    }
    context
}
