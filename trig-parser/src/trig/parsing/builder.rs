//! Grammar construction
//!
//! Rules are written as a name, a list of symbol strings (`$name` for terminals) and a
//! reducer. The list helpers expand into plain rules:
//!
//! - [`GrammarBuilder::many`] (`name := item*`) produces a list value,
//! - [`GrammarBuilder::separated`] (`name := (item (sep item)*)?`) produces a list value
//!   with the separators dropped,
//! - [`GrammarBuilder::alias`] (`name := target`) passes the value through.
//!
//! Helper nonterminals are named `%1`, `%2`, ... and cannot collide with user rules.

use super::engine::{Alternative, Grammar, Reducer, Symbol};
use super::semantic::{Args, ReduceError, SemanticValue};
use crate::trig::error::GrammarError;
use std::collections::HashMap;

pub struct GrammarBuilder<V> {
    entry: String,
    rules: HashMap<String, Vec<Alternative<V>>>,
    hidden: usize,
}

impl<V: SemanticValue> GrammarBuilder<V> {
    pub fn new(entry: &str) -> Self {
        GrammarBuilder {
            entry: entry.to_string(),
            rules: HashMap::new(),
            hidden: 0,
        }
    }

    /// Append an alternative to `name`. Alternatives are tried in the order added.
    pub fn rule<F>(mut self, name: &str, symbols: &[&str], reduce: F) -> Self
    where
        F: Fn(Args<V>) -> Result<V, ReduceError> + Send + Sync + 'static,
    {
        self.push(name, symbols.iter().map(|s| Symbol::parse(s)).collect(), Box::new(reduce));
        self
    }

    /// `name := target`, value passed through unchanged.
    pub fn alias(self, name: &str, target: &str) -> Self {
        self.rule(name, &[target], |mut args| args.next())
    }

    /// `name := item*`
    pub fn many(mut self, name: &str, item: &str) -> Self {
        let tail = self.hidden_name();
        self.push(name, Vec::new(), Box::new(|_| Ok(V::from_list(Vec::new()))));
        self.push(name, vec![Symbol::Rule(tail.clone())], Box::new(|mut args| args.next()));
        self.push_list_tail(&tail, item, None);
        self
    }

    /// `name := (item (sep item)*)?`
    pub fn separated(mut self, name: &str, item: &str, separator: &str) -> Self {
        let tail = self.hidden_name();
        self.push(name, Vec::new(), Box::new(|_| Ok(V::from_list(Vec::new()))));
        self.push(name, vec![Symbol::Rule(tail.clone())], Box::new(|mut args| args.next()));
        self.push_list_tail(&tail, item, Some(separator));
        self
    }

    /// Check that every referenced nonterminal, the entry included, has alternatives.
    pub fn build(self) -> Result<Grammar<V>, GrammarError> {
        if !self.rules.contains_key(&self.entry) {
            return Err(GrammarError::UnknownRule(self.entry));
        }
        for alternatives in self.rules.values() {
            for symbol in alternatives.iter().flat_map(|alt| alt.symbols.iter()) {
                if let Symbol::Rule(name) = symbol {
                    if !self.rules.contains_key(name) {
                        return Err(GrammarError::UnknownRule(name.clone()));
                    }
                }
            }
        }
        Ok(Grammar {
            rules: self.rules,
            entry: self.entry,
        })
    }

    fn push(&mut self, name: &str, symbols: Vec<Symbol>, reduce: Reducer<V>) {
        self.rules
            .entry(name.to_string())
            .or_default()
            .push(Alternative { symbols, reduce });
    }

    fn hidden_name(&mut self) -> String {
        self.hidden += 1;
        format!("%{}", self.hidden)
    }

    // tail := item rest
    // rest := ε | [sep] tail
    //
    // Keeps each item matched once per position.
    fn push_list_tail(&mut self, tail: &str, item: &str, separator: Option<&str>) {
        let rest = self.hidden_name();
        self.push(
            tail,
            vec![Symbol::parse(item), Symbol::Rule(rest.clone())],
            Box::new(|mut args| {
                let head = args.next()?;
                let mut items = args.next()?.into_list()?;
                items.insert(0, head);
                Ok(V::from_list(items))
            }),
        );

        self.push(&rest, Vec::new(), Box::new(|_| Ok(V::from_list(Vec::new()))));
        let mut symbols = Vec::new();
        if let Some(separator) = separator {
            symbols.push(Symbol::parse(separator));
        }
        symbols.push(Symbol::Rule(tail.to_string()));
        let skip = usize::from(separator.is_some());
        self.push(
            &rest,
            symbols,
            Box::new(move |mut args| {
                args.skip(skip)?;
                args.next()
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trig::error::CompileError;
    use crate::trig::token::{Token, TokenValue};

    #[derive(Debug, Clone, PartialEq)]
    enum Tree {
        Leaf(String),
        List(Vec<Tree>),
    }

    impl SemanticValue for Tree {
        fn from_token(token: &Token) -> Self {
            Tree::Leaf(token.raw.clone())
        }
        fn from_list(items: Vec<Self>) -> Self {
            Tree::List(items)
        }
        fn into_list(self) -> Result<Vec<Self>, ReduceError> {
            match self {
                Tree::List(items) => Ok(items),
                other => Err(ReduceError::unexpected("list", &other)),
            }
        }
    }

    fn tokens(names: &[&str]) -> Vec<Token> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Token::new(*n, *n, TokenValue::None, i * 2))
            .collect()
    }

    fn leaf(s: &str) -> Tree {
        Tree::Leaf(s.to_string())
    }

    #[test]
    fn test_separated_drops_separators() {
        let grammar = GrammarBuilder::<Tree>::new("list")
            .separated("list", "$a", "$,")
            .build()
            .unwrap();
        let parsed = grammar.parse(&tokens(&["a", ",", "a", ",", "a"]), 10).unwrap();
        assert_eq!(parsed, Tree::List(vec![leaf("a"), leaf("a"), leaf("a")]));

        let empty = grammar.parse(&[], 0).unwrap();
        assert_eq!(empty, Tree::List(vec![]));
    }

    #[test]
    fn test_many_and_alias() {
        let grammar = GrammarBuilder::<Tree>::new("start")
            .alias("start", "items")
            .many("items", "$x")
            .build()
            .unwrap();
        let parsed = grammar.parse(&tokens(&["x", "x"]), 4).unwrap();
        assert_eq!(parsed, Tree::List(vec![leaf("x"), leaf("x")]));
    }

    #[test]
    fn test_unknown_rule_rejected_at_build() {
        let err = GrammarBuilder::<Tree>::new("start")
            .rule("start", &["missing"], |mut a| a.next())
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::UnknownRule("missing".to_string()));
    }

    #[test]
    fn test_ambiguous_grammar_yields_every_parse() {
        // s := x x | p ; p := x x
        let grammar = GrammarBuilder::<Tree>::new("s")
            .rule("s", &["$x", "$x"], |_| Ok(leaf("flat")))
            .rule("s", &["p"], |mut a| a.next())
            .rule("p", &["$x", "$x"], |_| Ok(leaf("nested")))
            .build()
            .unwrap();
        let all = grammar.parse_all(&tokens(&["x", "x"]), 4).unwrap();
        assert_eq!(all, vec![leaf("flat"), leaf("nested")]);
        assert_eq!(grammar.parse(&tokens(&["x", "x"]), 4).unwrap(), leaf("flat"));
    }

    #[test]
    fn test_failure_reports_furthest_position() {
        let grammar = GrammarBuilder::<Tree>::new("s")
            .rule("s", &["$a", "$b"], |_| Ok(leaf("ab")))
            .rule("s", &["$a", "$c"], |_| Ok(leaf("ac")))
            .build()
            .unwrap();
        let err = grammar.parse(&tokens(&["a", "d"]), 4).unwrap_err();
        let CompileError::Parse(err) = err else {
            panic!("expected parse error, got {:?}", err);
        };
        assert_eq!(err.offset, 2);
        assert_eq!(err.found, "d");
        let expected: Vec<&str> = err.expected.iter().map(String::as_str).collect();
        assert_eq!(expected, vec!["b", "c"]);
    }

    #[test]
    fn test_trailing_tokens_expect_end() {
        let grammar = GrammarBuilder::<Tree>::new("s")
            .rule("s", &["$a"], |_| Ok(leaf("a")))
            .build()
            .unwrap();
        let err = grammar.parse(&tokens(&["a", "a"]), 4).unwrap_err();
        let CompileError::Parse(err) = err else {
            panic!("expected parse error");
        };
        assert_eq!(err.offset, 2);
        assert!(err.expected.contains("%end"));
    }

    #[test]
    fn test_reducer_failure_is_grammar_error() {
        let grammar = GrammarBuilder::<Tree>::new("s")
            .rule("s", &["$a"], |_| Err(ReduceError::new("boom")))
            .build()
            .unwrap();
        let err = grammar.parse(&tokens(&["a"]), 1).unwrap_err();
        assert_eq!(
            err,
            CompileError::Grammar(GrammarError::Reduce {
                rule: "s".to_string(),
                message: "boom".to_string()
            })
        );
    }
}
