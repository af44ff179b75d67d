//! Name dictionaries merged across every library and import
//!
//! Presets, callables, triggers and global variables each live in their own dictionary.
//! A later definition replaces an earlier one of the same name in the same dictionary,
//! whichever library either comes from; the replacement is logged.

use crate::trig::ast::{
    Allocatable, Allocated, Allocation, CallableKind, Definition, ExternalDefinition,
    ExternalFunction, ExternalPreset, ExternalVariable, FunctionDef, PresetDef, Program, Scope,
    TriggerDef, Value, VariableDef,
};
use crate::trig::error::CompileError;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub enum CallableRef<'a> {
    Library(&'a FunctionDef),
    External(&'a ExternalFunction),
}

/// A formal parameter as seen from a call site.
#[derive(Debug, Clone, Copy)]
pub struct Formal<'a> {
    pub name: &'a str,
    pub allocation: Option<&'a Allocation>,
    pub accepts_block: bool,
    pub has_default: bool,
    /// Default value of an external parameter, emitted at call sites that omit it
    pub external_default: Option<&'a Value>,
}

impl<'a> CallableRef<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            CallableRef::Library(f) => &f.name,
            CallableRef::External(f) => &f.name,
        }
    }

    pub fn kind(&self) -> CallableKind {
        match *self {
            CallableRef::Library(f) => f.kind,
            CallableRef::External(f) => f.kind,
        }
    }

    pub fn allocation(&self) -> Option<&'a Allocation> {
        match *self {
            CallableRef::Library(f) => f.allocation(),
            CallableRef::External(f) => f.allocation(),
        }
    }

    pub fn formals(&self) -> Vec<Formal<'a>> {
        match *self {
            CallableRef::Library(f) => f
                .params
                .iter()
                .map(|p| Formal {
                    name: &p.name,
                    allocation: p.allocation(),
                    accepts_block: p.accepts_block(),
                    has_default: p.default.is_some(),
                    external_default: None,
                })
                .collect(),
            CallableRef::External(f) => f
                .params
                .iter()
                .map(|p| Formal {
                    name: &p.name,
                    allocation: p.allocation(),
                    accepts_block: p.accepts_block(),
                    has_default: p.default.is_some(),
                    external_default: p.default.as_ref(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PresetRef<'a> {
    Library(&'a PresetDef),
    External(&'a ExternalPreset),
}

impl<'a> PresetRef<'a> {
    pub fn member(&self, name: &str) -> Option<&'a Allocation> {
        match *self {
            PresetRef::Library(p) => p
                .members
                .iter()
                .find(|m| m.name == name)
                .and_then(|m| m.allocation()),
            PresetRef::External(p) => p
                .members
                .iter()
                .find(|m| m.name == name)
                .and_then(|m| m.allocation()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum GlobalRef<'a> {
    Library(&'a VariableDef),
    External(&'a ExternalVariable),
}

impl<'a> GlobalRef<'a> {
    pub fn allocation(&self) -> Result<&'a Allocation, CompileError> {
        match *self {
            GlobalRef::Library(v) => v.allocated(),
            GlobalRef::External(v) => v.allocated(),
        }
    }
}

/// What a catalog leaf names, in lookup order.
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    Trigger(&'a TriggerDef),
    Callable(CallableRef<'a>),
    Preset(PresetRef<'a>),
    Global(GlobalRef<'a>),
}

#[derive(Debug, Default)]
pub struct SymbolTable<'a> {
    pub presets: HashMap<&'a str, PresetRef<'a>>,
    pub callables: HashMap<&'a str, CallableRef<'a>>,
    pub triggers: HashMap<&'a str, &'a TriggerDef>,
    pub globals: HashMap<&'a str, GlobalRef<'a>>,
}

fn insert<'a, T>(
    dictionary: &mut HashMap<&'a str, T>,
    kind: &str,
    name: &'a str,
    library: &str,
    entry: T,
) {
    if dictionary.insert(name, entry).is_some() {
        tracing::warn!(
            kind,
            name,
            library,
            "definition replaces an earlier one with the same name"
        );
    }
}

impl<'a> SymbolTable<'a> {
    pub fn new(program: &'a Allocated<Program>) -> Self {
        let mut table = SymbolTable::default();
        for scope in &program.scopes {
            match scope {
                Scope::Import(import) => {
                    for definition in &import.definitions {
                        table.add_external(&import.library, definition);
                    }
                }
                Scope::Library(library) => {
                    for definition in &library.definitions {
                        table.add_definition(&library.library, definition);
                    }
                }
            }
        }
        table
    }

    fn add_external(&mut self, library: &str, definition: &'a ExternalDefinition) {
        match definition {
            ExternalDefinition::Preset(p) => {
                insert(&mut self.presets, "preset", &p.name, library, PresetRef::External(p))
            }
            ExternalDefinition::Function(f) => insert(
                &mut self.callables,
                "callable",
                &f.name,
                library,
                CallableRef::External(f),
            ),
            ExternalDefinition::Variable(v) => {
                insert(&mut self.globals, "variable", &v.name, library, GlobalRef::External(v))
            }
        }
    }

    fn add_definition(&mut self, library: &str, definition: &'a Definition) {
        match definition {
            Definition::Preset(p) => {
                insert(&mut self.presets, "preset", &p.name, library, PresetRef::Library(p))
            }
            Definition::Function(f) => insert(
                &mut self.callables,
                "callable",
                &f.name,
                library,
                CallableRef::Library(f),
            ),
            Definition::Trigger(t) => insert(&mut self.triggers, "trigger", &t.name, library, t),
            Definition::Variable(v) => {
                insert(&mut self.globals, "variable", &v.name, library, GlobalRef::Library(v))
            }
        }
    }

    pub fn callable(&self, name: &str) -> Result<CallableRef<'a>, CompileError> {
        self.callables
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::unresolved(name))
    }

    pub fn preset(&self, name: &str) -> Result<PresetRef<'a>, CompileError> {
        self.presets
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::unresolved(name))
    }

    pub fn global(&self, name: &str) -> Option<GlobalRef<'a>> {
        self.globals.get(name).copied()
    }

    /// Catalog leaf lookup: trigger, callable, preset, then global variable.
    pub fn entry(&self, name: &str) -> Option<Entry<'a>> {
        if let Some(trigger) = self.triggers.get(name) {
            return Some(Entry::Trigger(*trigger));
        }
        if let Some(callable) = self.callables.get(name) {
            return Some(Entry::Callable(*callable));
        }
        if let Some(preset) = self.presets.get(name) {
            return Some(Entry::Preset(*preset));
        }
        self.globals.get(name).map(|global| Entry::Global(*global))
    }
}
