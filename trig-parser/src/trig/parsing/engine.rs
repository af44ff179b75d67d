//! Backtracking matcher
//!
//! Matching a nonterminal at a position tries **every** alternative, and inside an
//! alternative every match length of every nonterminal symbol, recursively. The result
//! is the full list of `(value, end position)` pairs for that nonterminal at that
//! position, so an ambiguous grammar yields several parses at the entry point.
//!
//! There is no memoization; a nonterminal may be re-matched at the same position by
//! sibling branches. Each branch receives its own clone of every matched value, so no
//! two parses ever share a node.
//!
//! Grammars must not be left-recursive; list sugar is right-recursive for that reason.
//!
//! Failure tracking spans the whole top-level attempt: the furthest token at which a
//! terminal comparison failed is kept, together with every terminal name that was
//! tried there. That becomes the [`ParseError`] when no parse exists.

use super::semantic::{Args, ReduceError, SemanticValue};
use crate::trig::error::{CompileError, GrammarError, ParseError};
use crate::trig::token::{Token, BEGIN, END};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

pub type Reducer<V> = Box<dyn Fn(Args<V>) -> Result<V, ReduceError> + Send + Sync>;

/// A grammar symbol. Written as `$name` for terminals and `name` for nonterminals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Terminal(String),
    Rule(String),
}

impl Symbol {
    pub fn parse(text: &str) -> Symbol {
        match text.strip_prefix('$') {
            Some(terminal) => Symbol::Terminal(terminal.to_string()),
            None => Symbol::Rule(text.to_string()),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(name) => write!(f, "${}", name),
            Symbol::Rule(name) => write!(f, "{}", name),
        }
    }
}

/// One alternative of a nonterminal: a symbol sequence and the reducer applied to the
/// values it matched.
pub struct Alternative<V> {
    pub symbols: Vec<Symbol>,
    pub(crate) reduce: Reducer<V>,
}

/// A flat rule table: nonterminal name to its ordered alternatives.
///
/// Built once by [`super::GrammarBuilder`]; read-only while parsing.
pub struct Grammar<V> {
    pub(crate) rules: HashMap<String, Vec<Alternative<V>>>,
    pub(crate) entry: String,
}

impl<V> fmt::Debug for Grammar<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.rules.keys().collect();
        names.sort();
        let mut map = f.debug_map();
        for name in names {
            let alternatives: Vec<String> = self.rules[name]
                .iter()
                .map(|alt| {
                    alt.symbols
                        .iter()
                        .map(Symbol::to_string)
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            map.entry(name, &alternatives);
        }
        map.finish()
    }
}

impl<V: SemanticValue> Grammar<V> {
    /// Every complete parse of `tokens`, in discovery order.
    ///
    /// The stream is wrapped in `%begin` / `%end` sentinels; `source_len` becomes the
    /// offset of the end sentinel so failures at end of input point past the last token.
    pub fn parse_all(&self, tokens: &[Token], source_len: usize) -> Result<Vec<V>, CompileError> {
        let mut stream = Vec::with_capacity(tokens.len() + 2);
        stream.push(Token::sentinel(BEGIN, 0));
        stream.extend_from_slice(tokens);
        stream.push(Token::sentinel(END, source_len));

        let mut matcher = Matcher {
            grammar: self,
            tokens: &stream,
            failure: Failure::default(),
        };
        let sequence = [
            Symbol::Terminal(BEGIN.to_string()),
            Symbol::Rule(self.entry.clone()),
            Symbol::Terminal(END.to_string()),
        ];
        let mut matches = Vec::new();
        matcher.match_sequence(&sequence, 0, &mut Vec::new(), &mut matches)?;

        let results: Vec<V> = matches
            .into_iter()
            .filter(|(_, end)| *end == stream.len())
            .filter_map(|(values, _)| values.into_iter().nth(1))
            .collect();

        if results.is_empty() {
            return Err(matcher.failure.into_error(&stream).into());
        }
        Ok(results)
    }

    /// The first complete parse. Further parses mean the grammar is ambiguous for this
    /// input; they are dropped with a warning.
    pub fn parse(&self, tokens: &[Token], source_len: usize) -> Result<V, CompileError> {
        let results = self.parse_all(tokens, source_len)?;
        if results.len() > 1 {
            tracing::warn!(
                entry = %self.entry,
                parses = results.len(),
                "ambiguous input, using the first parse"
            );
        }
        results
            .into_iter()
            .next()
            .ok_or_else(|| GrammarError::UnknownRule(self.entry.clone()).into())
    }
}

#[derive(Debug, Default)]
struct Failure {
    index: Option<usize>,
    expected: BTreeSet<String>,
}

impl Failure {
    fn record(&mut self, index: usize, expected: &str) {
        match self.index {
            Some(current) if current > index => {}
            Some(current) if current == index => {
                self.expected.insert(expected.to_string());
            }
            _ => {
                self.index = Some(index);
                self.expected.clear();
                self.expected.insert(expected.to_string());
            }
        }
    }

    fn into_error(self, stream: &[Token]) -> ParseError {
        let index = self.index.unwrap_or(0).min(stream.len().saturating_sub(1));
        let (offset, found, found_text) = stream
            .get(index)
            .map(|t| (t.offset, t.name.clone(), t.raw.clone()))
            .unwrap_or_default();
        ParseError {
            offset,
            found,
            found_text,
            expected: self.expected,
        }
    }
}

struct Matcher<'g, 't, V> {
    grammar: &'g Grammar<V>,
    tokens: &'t [Token],
    failure: Failure,
}

type Matches<V> = Vec<(V, usize)>;

impl<'g, 't, V: SemanticValue> Matcher<'g, 't, V> {
    fn match_symbol(&mut self, symbol: &Symbol, pos: usize) -> Result<Matches<V>, GrammarError> {
        match symbol {
            Symbol::Terminal(name) => {
                let Some(token) = self.tokens.get(pos) else {
                    return Ok(Vec::new());
                };
                if &token.name == name {
                    Ok(vec![(V::from_token(token), pos + 1)])
                } else {
                    self.failure.record(pos, name);
                    Ok(Vec::new())
                }
            }
            Symbol::Rule(name) => self.match_rule(name, pos),
        }
    }

    fn match_rule(&mut self, name: &str, pos: usize) -> Result<Matches<V>, GrammarError> {
        let grammar = self.grammar;
        let alternatives = grammar
            .rules
            .get(name)
            .ok_or_else(|| GrammarError::UnknownRule(name.to_string()))?;

        let mut results = Vec::new();
        for alternative in alternatives {
            let mut matches = Vec::new();
            self.match_sequence(&alternative.symbols, pos, &mut Vec::new(), &mut matches)?;
            for (values, end) in matches {
                let value = (alternative.reduce)(Args::new(values)).map_err(|err| {
                    GrammarError::Reduce {
                        rule: name.to_string(),
                        message: err.message,
                    }
                })?;
                results.push((value, end));
            }
        }
        Ok(results)
    }

    fn match_sequence(
        &mut self,
        symbols: &[Symbol],
        pos: usize,
        acc: &mut Vec<V>,
        out: &mut Vec<(Vec<V>, usize)>,
    ) -> Result<(), GrammarError> {
        let Some((first, rest)) = symbols.split_first() else {
            out.push((acc.clone(), pos));
            return Ok(());
        };
        for (value, end) in self.match_symbol(first, pos)? {
            acc.push(value);
            self.match_sequence(rest, end, acc, out)?;
            acc.pop();
        }
        Ok(())
    }
}
