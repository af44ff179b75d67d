//! Id and string-table allocation
//!
//! The allocator walks a parsed tree top-down, left to right, outer before inner, and
//! gives every definable node the next id of its library. Named entities add a label row
//! (`<Kind>/Name/<prefix><id>`), text literals add a value row (`Param/Value/<prefix><id>`).
//!
//! Order inside a library scope:
//!
//! - preset, then each member
//! - global variable, then its value
//! - trigger, then its event call, locals and statements
//! - function or action, then each parameter (and its default), locals and statements
//!
//! Every value gets an id; a call value gets a second one for the call itself. Array
//! indices and block contents are allocated where they appear.
//!
//! Import scopes allocate nothing: external entities are bound to their host library and
//! the id written in the source. The one exception are default values of external
//! parameters, which are values of this run and are allocated in the default library.
//!
//! The walk is deterministic: equal trees allocated from equal counters produce equal ids
//! and equal rows. Allocation consumes the tree and returns it as [`Allocated`], so a tree
//! cannot be allocated twice.

pub mod ids;
pub mod strings;

pub use ids::{IdAllocator, ID_BASE};
pub use strings::StringTable;

use crate::trig::ast::{
    Allocatable, Allocated, Allocation, Block, Call, Catalog, CatalogItem, Definition,
    ExternalDefinition, ImportScope, LibraryScope, ParamDef, Program, Scope, Value, ValueKind,
    VariableDef, DEFAULT_LIBRARY,
};

/// Label table path segments
pub mod kinds {
    pub const TRIGGER: &str = "Trigger";
    pub const FUNCTION_DEF: &str = "FunctionDef";
    pub const VARIABLE: &str = "Variable";
    pub const PARAM_DEF: &str = "ParamDef";
    pub const PRESET: &str = "Preset";
    pub const PRESET_VALUE: &str = "PresetValue";
    pub const CATEGORY: &str = "Category";
    pub const LIBRARY: &str = "Library";
}

/// Allocation state of one run: id counters plus both string tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocator {
    ids: IdAllocator,
    labels: StringTable,
    values: StringTable,
}

impl Allocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from saved state, e.g. after a cache hit.
    pub fn from_parts(ids: IdAllocator, labels: StringTable, values: StringTable) -> Self {
        Allocator {
            ids,
            labels,
            values,
        }
    }

    pub fn into_parts(self) -> (IdAllocator, StringTable, StringTable) {
        (self.ids, self.labels, self.values)
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn labels(&self) -> &StringTable {
        &self.labels
    }

    pub fn values(&self) -> &StringTable {
        &self.values
    }

    pub fn allocate_program(&mut self, mut program: Program) -> Allocated<Program> {
        let before = self.ids.issued();
        for scope in &mut program.scopes {
            match scope {
                Scope::Import(import) => self.bind_import(import),
                Scope::Library(library) => self.library(library),
            }
        }
        tracing::debug!(ids = self.ids.issued() - before, "allocated program");
        Allocated::new(program)
    }

    pub fn allocate_catalog(&mut self, mut catalog: Catalog) -> Allocated<Catalog> {
        let before = self.ids.issued();
        for library in &mut catalog.libraries {
            if library.name != DEFAULT_LIBRARY {
                self.labels.put(
                    format!("{}/Name/{}", kinds::LIBRARY, library.name),
                    library.description.clone(),
                );
            }
            self.items(&library.name, &mut library.items);
        }
        tracing::debug!(ids = self.ids.issued() - before, "allocated catalog");
        Allocated::new(catalog)
    }

    fn assign(&mut self, library: &str, node: &mut impl Allocatable) -> Allocation {
        let allocation = self.ids.allocate(library);
        *node.slot() = Some(allocation.clone());
        allocation
    }

    fn label(&mut self, kind: &str, allocation: &Allocation, text: &str) {
        self.labels
            .put(format!("{}/Name/{}", kind, allocation.string_key()), text);
    }

    fn bind_import(&mut self, import: &mut ImportScope) {
        let library = import.library.clone();
        for definition in &mut import.definitions {
            match definition {
                // the preset itself has no id of its own, only its members do
                ExternalDefinition::Preset(preset) => {
                    for member in &mut preset.members {
                        member.allocation = Some(Allocation::new(library.clone(), member.id));
                    }
                }
                ExternalDefinition::Function(function) => {
                    function.allocation = Some(Allocation::new(library.clone(), function.id));
                    for param in &mut function.params {
                        param.allocation = Some(Allocation::new(library.clone(), param.id));
                        if let Some(default) = &mut param.default {
                            self.value(DEFAULT_LIBRARY, default);
                        }
                    }
                }
                ExternalDefinition::Variable(variable) => {
                    variable.allocation = Some(Allocation::new(library.clone(), variable.id));
                }
            }
        }
    }

    fn library(&mut self, scope: &mut LibraryScope) {
        let LibraryScope {
            library,
            definitions,
        } = scope;
        for definition in definitions {
            match definition {
                Definition::Preset(preset) => {
                    let allocation = self.assign(library, preset);
                    self.label(kinds::PRESET, &allocation, &preset.description);
                    for member in &mut preset.members {
                        let allocation = self.assign(library, member);
                        self.label(kinds::PRESET_VALUE, &allocation, &member.name);
                    }
                }
                Definition::Variable(variable) => self.variable(library, variable),
                Definition::Trigger(trigger) => {
                    let allocation = self.assign(library, trigger);
                    self.label(kinds::TRIGGER, &allocation, &trigger.description);
                    self.call(library, &mut trigger.event);
                    self.block(library, &mut trigger.body);
                }
                Definition::Function(function) => {
                    let allocation = self.assign(library, function);
                    self.label(kinds::FUNCTION_DEF, &allocation, &function.description);
                    for param in &mut function.params {
                        self.param(library, param);
                    }
                    self.block(library, &mut function.body);
                }
            }
        }
    }

    fn param(&mut self, library: &str, param: &mut ParamDef) {
        let allocation = self.assign(library, param);
        self.label(kinds::PARAM_DEF, &allocation, &param.name);
        if let Some(default) = &mut param.default {
            self.value(library, default);
        }
    }

    fn variable(&mut self, library: &str, variable: &mut VariableDef) {
        let allocation = self.assign(library, variable);
        self.label(kinds::VARIABLE, &allocation, &variable.name);
        self.value(library, &mut variable.value);
    }

    fn block(&mut self, library: &str, block: &mut Block) {
        for local in &mut block.locals {
            self.variable(library, local);
        }
        for statement in &mut block.statements {
            self.call(library, statement);
        }
    }

    fn call(&mut self, library: &str, call: &mut Call) {
        self.assign(library, call);
        for arg in &mut call.args {
            self.value(library, arg);
        }
    }

    fn value(&mut self, library: &str, value: &mut Value) {
        let allocation = self.assign(library, value);
        match &mut value.kind {
            ValueKind::Text(text) => {
                self.values
                    .put(format!("Param/Value/{}", allocation.string_key()), text.clone());
            }
            ValueKind::ArrayElement { indices, .. } => {
                for index in indices {
                    self.value(library, index);
                }
            }
            ValueKind::Call(call) => self.call(library, call),
            ValueKind::Block(block) => self.block(library, block),
            ValueKind::String(_)
            | ValueKind::Int(_)
            | ValueKind::Bool(_)
            | ValueKind::PresetMember { .. }
            | ValueKind::Variable(_) => {}
        }
    }

    fn items(&mut self, library: &str, items: &mut [CatalogItem]) {
        for item in items {
            if let CatalogItem::Folder(folder) = item {
                let allocation = self.assign(library, folder);
                self.label(kinds::CATEGORY, &allocation, &folder.description);
                self.items(library, &mut folder.items);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trig::ast::ElementId;
    use crate::trig::grammars::{parse_catalog, parse_program, CATALOG_LEXER, PROGRAM_LEXER};

    fn program(source: &str) -> Program {
        let tokens = PROGRAM_LEXER.tokenize(source).unwrap();
        parse_program(&tokens, source.len()).unwrap()
    }

    #[test]
    fn test_preset_allocation() {
        let mut allocator = Allocator::new();
        let allocated = allocator
            .allocate_program(program(r#"library "0" { preset Colors "Colors" { Red, Green } }"#));
        assert_eq!(allocator.ids().issued(), 3);
        assert_eq!(
            allocator.labels().render(),
            "Preset/Name/10000001=Colors\nPresetValue/Name/10000002=Red\nPresetValue/Name/10000003=Green"
        );
        let Scope::Library(library) = &allocated.scopes[0] else {
            panic!("expected library");
        };
        let Definition::Preset(preset) = &library.definitions[0] else {
            panic!("expected preset");
        };
        assert_eq!(
            preset.members[1].allocation,
            Some(Allocation::new("0", ElementId::new(0x1000_0003)))
        );
    }

    #[test]
    fn test_call_value_takes_two_ids_and_text_emits_value_row() {
        let mut allocator = Allocator::new();
        allocator.allocate_program(program(
            r#"library "L" { string s = concat(text"hi", "x"); }"#,
        ));
        // variable, value, call, text arg, string arg
        assert_eq!(allocator.ids().last("L"), Some(ElementId::new(0x1000_0005)));
        assert_eq!(
            allocator.values().render(),
            "Param/Value/lib_L_10000004=hi"
        );
        assert_eq!(
            allocator.labels().get("Variable/Name/lib_L_10000001"),
            Some("s")
        );
    }

    #[test]
    fn test_imports_bind_given_ids() {
        let mut allocator = Allocator::new();
        let allocated = allocator.allocate_program(program(
            r#"import "Ntve" { function Abs = 0000000A (v: int = 0000000B); }"#,
        ));
        assert_eq!(allocator.ids().issued(), 0);
        assert!(allocator.labels().is_empty());
        let Scope::Import(import) = &allocated.scopes[0] else {
            panic!("expected import");
        };
        let ExternalDefinition::Function(abs) = &import.definitions[0] else {
            panic!("expected function");
        };
        assert_eq!(
            abs.allocation,
            Some(Allocation::new("Ntve", ElementId::new(0xA)))
        );
        assert_eq!(
            abs.params[0].allocation,
            Some(Allocation::new("Ntve", ElementId::new(0xB)))
        );
    }

    #[test]
    fn test_catalog_shares_counters_with_program() {
        let mut allocator = Allocator::new();
        allocator.allocate_program(program(r#"library "0" { int x = 1; }"#));
        let source = r#"library "0" "Main" { folder "F" { x } } library "Q" "Quest" { folder "G" { } }"#;
        let tokens = CATALOG_LEXER.tokenize(source).unwrap();
        allocator.allocate_catalog(parse_catalog(&tokens, source.len()).unwrap());
        assert_eq!(allocator.labels().get("Category/Name/10000003"), Some("F"));
        assert_eq!(allocator.labels().get("Library/Name/Q"), Some("Quest"));
        assert_eq!(
            allocator.labels().get("Category/Name/lib_Q_10000001"),
            Some("G")
        );
        assert_eq!(allocator.labels().get("Library/Name/0"), None);
    }
}
