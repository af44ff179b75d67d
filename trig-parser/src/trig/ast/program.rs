//! Program-language nodes
//!
//! A program is a sequence of scopes. `library` scopes hold definitions that are allocated
//! in that library; `import` scopes declare entities the host already owns, each bound to a
//! pre-supplied id.

use super::ids::{allocatable, Allocation, ElementId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub scopes: Vec<Scope>,
}

impl Program {
    pub fn libraries(&self) -> impl Iterator<Item = &LibraryScope> {
        self.scopes.iter().filter_map(|scope| match scope {
            Scope::Library(library) => Some(library),
            Scope::Import(_) => None,
        })
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportScope> {
        self.scopes.iter().filter_map(|scope| match scope {
            Scope::Import(import) => Some(import),
            Scope::Library(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Import(ImportScope),
    Library(LibraryScope),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportScope {
    pub library: String,
    pub definitions: Vec<ExternalDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryScope {
    pub library: String,
    pub definitions: Vec<Definition>,
}

/// `key` or `key="value"` inside a `[...]` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn flag(key: impl Into<String>) -> Self {
        Attribute {
            key: key.into(),
            value: None,
        }
    }

    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

pub(crate) fn has_flag(attributes: &[Attribute], key: &str) -> bool {
    attributes.iter().any(|a| a.key == key)
}

pub(crate) fn attribute_value<'a>(attributes: &'a [Attribute], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.key == key)
        .and_then(|a| a.value.as_deref())
}

/// A declared type; `int[4][n]` has two dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    pub dims: Vec<ArrayDim>,
}

pub const VOID: &str = "void";

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef {
            name: name.into(),
            dims: Vec::new(),
        }
    }

    pub fn void() -> Self {
        TypeRef::named(VOID)
    }

    pub fn is_void(&self) -> bool {
        self.name == VOID && self.dims.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayDim {
    Size(i64),
    Variable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableKind {
    Function,
    Action,
    Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub kind: ValueKind,
    pub allocation: Option<Allocation>,
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Value {
            kind,
            allocation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// `text"..."`, externalized into the value string table
    Text(String),
    String(String),
    Int(i64),
    Bool(bool),
    /// `Preset.Member`
    PresetMember { preset: String, member: String },
    Variable(String),
    /// `name[i][j]`
    ArrayElement { name: String, indices: Vec<Value> },
    Call(Call),
    /// A statement block, only valid as the actual of a block parameter
    Block(Block),
}

impl ValueKind {
    /// Host type name of a literal.
    pub fn literal_type(&self) -> Option<&'static str> {
        match self {
            ValueKind::Text(_) => Some("text"),
            ValueKind::String(_) => Some("string"),
            ValueKind::Int(_) => Some("int"),
            ValueKind::Bool(_) => Some("bool"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub callee: String,
    pub args: Vec<Value>,
    pub allocation: Option<Allocation>,
}

impl Call {
    pub fn new(callee: impl Into<String>, args: Vec<Value>) -> Self {
        Call {
            callee: callee.into(),
            args,
            allocation: None,
        }
    }
}

/// `{ locals statements }`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub locals: Vec<VariableDef>,
    pub statements: Vec<Call>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    pub attributes: Vec<Attribute>,
    pub ty: TypeRef,
    pub name: String,
    pub value: Value,
    pub allocation: Option<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub attributes: Vec<Attribute>,
    pub name: String,
    pub ty: TypeRef,
    pub default: Option<Value>,
    pub allocation: Option<Allocation>,
}

impl ParamDef {
    pub fn accepts_block(&self) -> bool {
        has_flag(&self.attributes, "block")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetMember {
    pub name: String,
    pub allocation: Option<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetDef {
    pub attributes: Vec<Attribute>,
    pub name: String,
    pub description: String,
    pub members: Vec<PresetMember>,
    pub allocation: Option<Allocation>,
}

/// A function (`kind == Function`) or an action (`kind == Action`, always void).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub kind: CallableKind,
    pub attributes: Vec<Attribute>,
    pub name: String,
    pub description: String,
    pub params: Vec<ParamDef>,
    pub returns: TypeRef,
    /// Locals declared before and inside the body braces, then the statements
    pub body: Block,
    pub allocation: Option<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDef {
    pub attributes: Vec<Attribute>,
    pub name: String,
    pub description: String,
    pub event: Call,
    pub body: Block,
    pub allocation: Option<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Definition {
    Preset(PresetDef),
    Variable(VariableDef),
    Function(FunctionDef),
    Trigger(TriggerDef),
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Definition::Preset(d) => &d.name,
            Definition::Variable(d) => &d.name,
            Definition::Function(d) => &d.name,
            Definition::Trigger(d) => &d.name,
        }
    }

    pub fn allocation(&self) -> Option<&Allocation> {
        match self {
            Definition::Preset(d) => d.allocation.as_ref(),
            Definition::Variable(d) => d.allocation.as_ref(),
            Definition::Function(d) => d.allocation.as_ref(),
            Definition::Trigger(d) => d.allocation.as_ref(),
        }
    }
}

/// `name: type = ID (default)` inside an external callable's parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalParam {
    pub attributes: Vec<Attribute>,
    pub name: String,
    pub ty: TypeRef,
    pub id: ElementId,
    pub default: Option<Value>,
    pub allocation: Option<Allocation>,
}

impl ExternalParam {
    pub fn accepts_block(&self) -> bool {
        has_flag(&self.attributes, "block")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalFunction {
    pub kind: CallableKind,
    pub attributes: Vec<Attribute>,
    pub name: String,
    pub id: ElementId,
    pub params: Vec<ExternalParam>,
    pub returns: TypeRef,
    pub allocation: Option<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPresetMember {
    pub name: String,
    pub id: ElementId,
    pub allocation: Option<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPreset {
    pub attributes: Vec<Attribute>,
    pub name: String,
    pub members: Vec<ExternalPresetMember>,
    pub allocation: Option<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalVariable {
    pub attributes: Vec<Attribute>,
    pub ty: TypeRef,
    pub name: String,
    pub id: ElementId,
    pub allocation: Option<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalDefinition {
    Preset(ExternalPreset),
    Function(ExternalFunction),
    Variable(ExternalVariable),
}

impl ExternalDefinition {
    pub fn name(&self) -> &str {
        match self {
            ExternalDefinition::Preset(d) => &d.name,
            ExternalDefinition::Function(d) => &d.name,
            ExternalDefinition::Variable(d) => &d.name,
        }
    }
}

allocatable!(
    Value,
    Call,
    VariableDef,
    ParamDef,
    PresetMember,
    PresetDef,
    FunctionDef,
    TriggerDef,
    ExternalParam,
    ExternalFunction,
    ExternalPresetMember,
    ExternalPreset,
    ExternalVariable,
);
