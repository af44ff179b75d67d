//! Transform pipeline infrastructure
//!
//! Stages implement [`Runnable<I, O>`]; a [`Transform<I, O>`] wraps a chain of them and
//! grows with [`Transform::then`], so the compiler checks that each stage accepts what the
//! previous one produced:
//!
//! ```rust,ignore
//! let to_ast = Transform::from_fn(Ok)
//!     .then(Tokenize::new(&PROGRAM_LEXER))   // String -> Lexed
//!     .then(ParseProgram);                     // Lexed -> Program
//! ```
//!
//! The standard chains are built once as `Lazy` statics in [`standard`]. Every stage fails
//! with the compiler's own [`CompileError`], so lexer and parser offsets survive the chain.
//!
//! - [`stages`]: individual stages (tokenizing, parsing)
//! - [`standard`]: pre-built chains for both languages

pub mod stages;
pub mod standard;

use crate::trig::error::CompileError;

/// Anything that can turn an input into an output
pub trait Runnable<I, O> {
    fn run(&self, input: I) -> Result<O, CompileError>;
}

/// A composable transformation from `I` to `O`
pub struct Transform<I, O> {
    run_fn: Box<dyn Fn(I) -> Result<O, CompileError> + Send + Sync>,
}

impl<I, O> Transform<I, O> {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(I) -> Result<O, CompileError> + Send + Sync + 'static,
    {
        Transform {
            run_fn: Box::new(f),
        }
    }

    /// Append a stage, returning a transform from `I` to the stage's output.
    pub fn then<O2, S>(self, stage: S) -> Transform<I, O2>
    where
        S: Runnable<O, O2> + Send + Sync + 'static,
        I: 'static,
        O: 'static,
        O2: 'static,
    {
        let prev_run = self.run_fn;
        Transform {
            run_fn: Box::new(move |input| {
                let intermediate = prev_run(input)?;
                stage.run(intermediate)
            }),
        }
    }

    /// Append a pre-built static transform.
    pub fn then_transform<O2>(self, next: &'static Transform<O, O2>) -> Transform<I, O2>
    where
        I: 'static,
        O: 'static,
        O2: 'static,
    {
        let prev_run = self.run_fn;
        Transform {
            run_fn: Box::new(move |input| {
                let intermediate = prev_run(input)?;
                next.run(intermediate)
            }),
        }
    }

    pub fn run(&self, input: I) -> Result<O, CompileError> {
        (self.run_fn)(input)
    }
}

impl<I, O> Runnable<I, O> for Transform<I, O>
where
    I: 'static,
    O: 'static,
{
    fn run(&self, input: I) -> Result<O, CompileError> {
        Transform::run(self, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DoubleNumber;
    impl Runnable<i64, i64> for DoubleNumber {
        fn run(&self, input: i64) -> Result<i64, CompileError> {
            Ok(input * 2)
        }
    }

    struct IntToString;
    impl Runnable<i64, String> for IntToString {
        fn run(&self, input: i64) -> Result<String, CompileError> {
            Ok(input.to_string())
        }
    }

    struct FailingStage;
    impl Runnable<i64, i64> for FailingStage {
        fn run(&self, _input: i64) -> Result<i64, CompileError> {
            Err(CompileError::shape("intentional failure"))
        }
    }

    #[test]
    fn test_type_changing_chain() {
        let transform = Transform::from_fn(|x: i64| Ok(x))
            .then(DoubleNumber)
            .then(DoubleNumber)
            .then(IntToString);
        assert_eq!(transform.run(5).unwrap(), "20");
    }

    #[test]
    fn test_error_stops_the_chain() {
        let transform = Transform::from_fn(|x: i64| Ok(x))
            .then(FailingStage)
            .then(IntToString);
        assert_eq!(
            transform.run(5).unwrap_err(),
            CompileError::shape("intentional failure")
        );
    }
}
