//! Tokens produced by the lexer and consumed by the grammar engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the synthetic token placed before the first real token.
pub const BEGIN: &str = "%begin";
/// Name of the synthetic token placed after the last real token.
pub const END: &str = "%end";

/// The value a token carries after its per-name transform ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TokenValue {
    None,
    Text(String),
    Int(i64),
    Bool(bool),
}

/// A lexed token. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub name: String,
    pub raw: String,
    pub value: TokenValue,
    pub offset: usize,
}

impl Token {
    pub fn new(name: impl Into<String>, raw: impl Into<String>, value: TokenValue, offset: usize) -> Self {
        Token {
            name: name.into(),
            raw: raw.into(),
            value,
            offset,
        }
    }

    /// A sentinel token with no text
    pub fn sentinel(name: &str, offset: usize) -> Self {
        Token::new(name, "", TokenValue::None, offset)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() || self.raw == self.name {
            write!(f, "<{}>", self.name)
        } else {
            write!(f, "<{}:{}>", self.name, self.raw)
        }
    }
}
