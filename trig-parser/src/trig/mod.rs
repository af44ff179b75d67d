//! Main module for trig library functionality

pub mod allocation;
pub mod ast;
pub mod building;
pub mod cache;
pub mod error;
pub mod formats;
pub mod grammars;
pub mod lexing;
pub mod parsing;
pub mod pipeline;
pub mod testing;
pub mod token;
pub mod transforms;
