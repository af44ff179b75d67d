//! Name resolution inside one definition
//!
//! Lookup order, first match wins:
//!
//! 1. statement-local scopes, innermost first (locals of block actuals)
//! 2. the definition's parameters
//! 3. the definition's own locals
//! 4. library globals
//!
//! A context belongs to the lowering of one definition and is dropped afterwards.

use super::symbols::SymbolTable;
use crate::trig::ast::Allocation;
use crate::trig::error::CompileError;
use std::collections::HashMap;

/// What a name resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Parameter(Allocation),
    Variable(Allocation),
}

impl Binding {
    /// Reference tag and `Type` attribute used when pointing at this binding.
    pub fn reference_kind(&self) -> (&'static str, &'static str) {
        match self {
            Binding::Parameter(_) => ("Parameter", "ParamDef"),
            Binding::Variable(_) => ("Variable", "Variable"),
        }
    }

    pub fn allocation(&self) -> &Allocation {
        match self {
            Binding::Parameter(a) | Binding::Variable(a) => a,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScopeContext {
    statement_locals: Vec<HashMap<String, Allocation>>,
    parameters: HashMap<String, Allocation>,
    locals: HashMap<String, Allocation>,
}

impl ScopeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parameter(&mut self, name: &str, allocation: &Allocation) {
        self.parameters.insert(name.to_string(), allocation.clone());
    }

    /// A local of the definition, or of the innermost open block when one is open.
    pub fn add_local(&mut self, name: &str, allocation: &Allocation) {
        match self.statement_locals.last_mut() {
            Some(frame) => frame.insert(name.to_string(), allocation.clone()),
            None => self.locals.insert(name.to_string(), allocation.clone()),
        };
    }

    pub fn open_block(&mut self) {
        self.statement_locals.push(HashMap::new());
    }

    pub fn close_block(&mut self) {
        self.statement_locals.pop();
    }

    pub fn resolve(&self, name: &str, symbols: &SymbolTable<'_>) -> Result<Binding, CompileError> {
        if let Some(allocation) = self
            .statement_locals
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
        {
            return Ok(Binding::Variable(allocation.clone()));
        }
        if let Some(allocation) = self.parameters.get(name) {
            return Ok(Binding::Parameter(allocation.clone()));
        }
        if let Some(allocation) = self.locals.get(name) {
            return Ok(Binding::Variable(allocation.clone()));
        }
        match symbols.global(name) {
            Some(global) => Ok(Binding::Variable(global.allocation()?.clone())),
            None => Err(CompileError::unresolved(name)),
        }
    }
}
