//! Values flowing through the grammar engine
//!
//! Terminals turn into values with [`SemanticValue::from_token`]; reducers turn the values
//! matched by an alternative into one value. List sugar needs to build and take apart lists,
//! hence `from_list` / `into_list`.

use crate::trig::token::Token;
use std::fmt;

pub trait SemanticValue: Clone + fmt::Debug + Send + Sync + 'static {
    fn from_token(token: &Token) -> Self;
    fn from_list(items: Vec<Self>) -> Self;
    fn into_list(self) -> Result<Vec<Self>, ReduceError>;
}

/// A reducer received values of the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceError {
    pub message: String,
}

impl ReduceError {
    pub fn new(message: impl Into<String>) -> Self {
        ReduceError {
            message: message.into(),
        }
    }

    pub fn unexpected(expected: &str, found: &impl fmt::Debug) -> Self {
        ReduceError::new(format!("expected {}, found {:?}", expected, found))
    }
}

impl fmt::Display for ReduceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ReduceError {}

/// The values matched by one alternative, consumed left to right by its reducer.
#[derive(Debug)]
pub struct Args<V> {
    values: std::vec::IntoIter<V>,
}

impl<V> Args<V> {
    pub fn new(values: Vec<V>) -> Self {
        Args {
            values: values.into_iter(),
        }
    }

    /// Take the next matched value.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<V, ReduceError> {
        self.values
            .next()
            .ok_or_else(|| ReduceError::new("reducer asked for more values than were matched"))
    }

    /// Drop the next `count` values (punctuation, keywords).
    pub fn skip(&mut self, count: usize) -> Result<&mut Self, ReduceError> {
        for _ in 0..count {
            self.next()?;
        }
        Ok(self)
    }
}
