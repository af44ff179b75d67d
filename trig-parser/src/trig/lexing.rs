//! Table-driven lexer
//!
//! A [`LexerSpec`] is configured with:
//!
//! 1. an ignore pattern (whitespace, comments),
//! 2. an ordered list of literal keywords,
//! 3. an ordered table of named regex patterns,
//! 4. optional per-name value transforms.
//!
//! At each position the ignore pattern is skipped first. Otherwise every keyword is
//! tried as a literal prefix in declaration order and the first hit wins, even when a
//! later keyword or a pattern would match more text. Keyword order therefore matters
//! when one keyword is a prefix of another (`-` before `->` would never produce `->`).
//! Only when no keyword matches are the named patterns tried, again first match wins.
//!
//! Tokens are named after the keyword text itself or the pattern name. Their value is
//! the raw text unless a transform is registered for that name.

use crate::trig::error::LexError;
use crate::trig::token::{Token, TokenValue};
use regex::Regex;
use std::collections::HashMap;

/// Converts the raw text of a token into its value. `None` rejects the token.
pub type ValueTransform = fn(&str) -> Option<TokenValue>;

/// A named pattern, anchored at the current position.
#[derive(Debug, Clone)]
pub struct TokenPattern {
    pub name: String,
    regex: Regex,
}

impl TokenPattern {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(TokenPattern {
            name: name.into(),
            regex: anchored(pattern)?,
        })
    }

    /// Length of the match at the start of `text`, if non-empty.
    fn match_len(&self, text: &str) -> Option<usize> {
        self.regex
            .find(text)
            .map(|m| m.end())
            .filter(|len| *len > 0)
    }
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})", pattern))
}

/// Lexer configuration and driver
#[derive(Debug, Clone)]
pub struct LexerSpec {
    ignore: Regex,
    keywords: Vec<String>,
    patterns: Vec<TokenPattern>,
    transforms: HashMap<String, ValueTransform>,
}

impl LexerSpec {
    pub fn new(ignore: &str) -> Result<Self, regex::Error> {
        Ok(LexerSpec {
            ignore: anchored(ignore)?,
            keywords: Vec::new(),
            patterns: Vec::new(),
            transforms: HashMap::new(),
        })
    }

    /// Append keywords, keeping declaration order.
    pub fn keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords
            .extend(keywords.iter().filter(|k| !k.is_empty()).map(|k| k.to_string()));
        self
    }

    pub fn pattern(mut self, name: &str, pattern: &str) -> Result<Self, regex::Error> {
        self.patterns.push(TokenPattern::new(name, pattern)?);
        Ok(self)
    }

    pub fn transform(mut self, name: &str, transform: ValueTransform) -> Self {
        self.transforms.insert(name.to_string(), transform);
        self
    }

    /// Split `source` into tokens. Sentinels are not added here.
    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut pos = 0;

        while pos < source.len() {
            let rest = &source[pos..];

            if let Some(m) = self.ignore.find(rest) {
                if !m.is_empty() {
                    pos += m.end();
                    continue;
                }
            }

            let (name, len) = match self.match_keyword(rest) {
                Some(keyword) => (keyword, keyword.len()),
                None => self
                    .match_pattern(rest)
                    .ok_or(LexError { offset: pos })?,
            };

            let raw = &rest[..len];
            let value = match self.transforms.get(name) {
                Some(transform) => transform(raw).ok_or(LexError { offset: pos })?,
                None => TokenValue::Text(raw.to_string()),
            };
            tokens.push(Token::new(name, raw, value, pos));
            pos += len;
        }

        tracing::debug!(tokens = tokens.len(), "tokenized source");
        Ok(tokens)
    }

    fn match_keyword(&self, text: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|keyword| text.starts_with(keyword.as_str()))
            .map(String::as_str)
    }

    fn match_pattern(&self, text: &str) -> Option<(&str, usize)> {
        self.patterns
            .iter()
            .find_map(|p| p.match_len(text).map(|len| (p.name.as_str(), len)))
    }
}

/// Strips one leading and one trailing quote character.
pub fn strip_quotes(raw: &str) -> Option<TokenValue> {
    let inner = raw.strip_suffix('"')?;
    let start = inner.find('"')? + 1;
    Some(TokenValue::Text(inner[start..].to_string()))
}

pub fn parse_int(raw: &str) -> Option<TokenValue> {
    raw.parse::<i64>().ok().map(TokenValue::Int)
}

pub fn parse_bool(raw: &str) -> Option<TokenValue> {
    match raw {
        "true" => Some(TokenValue::Bool(true)),
        "false" => Some(TokenValue::Bool(false)),
        _ => None,
    }
}

pub fn upper_case(raw: &str) -> Option<TokenValue> {
    Some(TokenValue::Text(raw.to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> LexerSpec {
        LexerSpec::new(r"\s+")
            .unwrap()
            .keywords(&["-", "->", "{", "}"])
            .pattern("int", r"-?\d+")
            .unwrap()
            .pattern("label", r"[a-z]+")
            .unwrap()
            .transform("int", parse_int)
    }

    fn names(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_keyword_order_wins_over_longer_keyword() {
        // "-" is declared before "->", so "->" can never be produced
        let err = spec().tokenize("->").unwrap_err();
        assert_eq!(err, LexError { offset: 1 });
    }

    #[test]
    fn test_keywords_before_patterns() {
        // "-" is a keyword, so "-5" lexes as "-" followed by int 5
        let tokens = spec().tokenize("-5 { abc }").unwrap();
        assert_eq!(names(&tokens), vec!["-", "int", "{", "label", "}"]);
        assert_eq!(tokens[1].value, TokenValue::Int(5));
        assert_eq!(tokens[3].value, TokenValue::Text("abc".to_string()));
    }

    #[test]
    fn test_offsets_skip_ignored_text() {
        let tokens = spec().tokenize("  abc   12").unwrap();
        assert_eq!(tokens[0].offset, 2);
        assert_eq!(tokens[1].offset, 8);
        assert_eq!(tokens[1].raw, "12");
    }

    #[test]
    fn test_unmatched_input_reports_offset() {
        let err = spec().tokenize("abc ?").unwrap_err();
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn test_rejecting_transform_is_a_lex_error() {
        let tokens = spec().tokenize("99999999999999999999");
        assert_eq!(tokens.unwrap_err(), LexError { offset: 0 });
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(
            strip_quotes("\"hi\""),
            Some(TokenValue::Text("hi".to_string()))
        );
        assert_eq!(
            strip_quotes("text\"a b\""),
            Some(TokenValue::Text("a b".to_string()))
        );
        assert_eq!(strip_quotes("\"\""), Some(TokenValue::Text(String::new())));
    }
}
