//! Program-language grammar
//!
//! ```text
//! program      := section*
//! section      := import | library
//! import       := "import" STR "{" ext_item* "}"
//! library      := "library" STR "{" lib_item* "}"
//! ext_item     := attrs "preset" LABEL "{" (LABEL "=" ID),* "}"
//!               | attrs ("function"|"action"|"event") LABEL "=" ID "(" ext_param,* ")" ret ";"
//!               | attrs type LABEL "=" ID ";"
//! ext_param    := attrs LABEL ":" type "=" ID [ "(" value ")" ]
//! lib_item     := attrs "preset" LABEL STR "{" LABEL,* "}"
//!               | attrs "function" LABEL STR "(" param,* ")" ret locals block
//!               | attrs "action"   LABEL STR "(" param,* ")" locals block
//!               | attrs "trigger"  LABEL STR call locals block
//!               | variable
//! variable     := attrs type LABEL "=" value ";"
//! param        := attrs LABEL ":" type [ "=" value ]
//! ret          := ε | "->" type
//! type         := LABEL ("[" (INT | LABEL) "]")*
//! attrs        := ε | "[" (LABEL | LABEL "=" STR),* "]"
//! locals       := variable*
//! block        := "{" variable* statement* "}"
//! statement    := call ";"
//! call         := LABEL "(" value,* ")"
//! value        := TEXT | STR | INT | BOOL | LABEL "." LABEL | LABEL
//!               | LABEL ("[" value "]")+ | call | block
//! ```
//!
//! Keywords are matched as literal prefixes before any pattern, so identifiers must not
//! start with a keyword spelling (`functionName` lexes as `function` + `Name`).

use super::{common_transforms, IGNORE, LABEL, STR};
use crate::trig::ast::{
    ArrayDim, Attribute, Block, Call, CallableKind, Definition, ElementId, ExternalDefinition,
    ExternalFunction, ExternalParam, ExternalPreset, ExternalPresetMember, ExternalVariable,
    FunctionDef, ImportScope, LibraryScope, ParamDef, PresetDef, PresetMember, Program, Scope,
    TriggerDef, TypeRef, Value, ValueKind, VariableDef,
};
use crate::trig::error::{CompileError, GrammarError};
use crate::trig::lexing::{upper_case, LexerSpec};
use crate::trig::parsing::{Args, Grammar, GrammarBuilder, ReduceError, SemanticValue};
use crate::trig::token::{Token, TokenValue};
use once_cell::sync::Lazy;

pub const KEYWORDS: &[&str] = &[
    "import", "library", "preset", "trigger", "function", "action", "event", "->", ";", ".",
    ",", "{", "}", "[", "]", "(", ")", "<", ">", ":", "=",
];

pub static PROGRAM_LEXER: Lazy<LexerSpec> = Lazy::new(|| {
    let spec = LexerSpec::new(IGNORE)
        .and_then(|spec| spec.keywords(KEYWORDS).pattern("id", r"[0-9A-Fa-f]{8}\b"))
        .and_then(|spec| spec.pattern("text", r#"text"[^"]*""#))
        .and_then(|spec| spec.pattern("str", STR))
        .and_then(|spec| spec.pattern("int", r"-?\d+"))
        .and_then(|spec| spec.pattern("bool", r"(true|false)\b"))
        .and_then(|spec| spec.pattern("label", LABEL))
        .expect("program token patterns are valid");
    common_transforms(spec).transform("id", upper_case)
});

pub static PROGRAM_GRAMMAR: Lazy<Grammar<ProgramSyntax>> =
    Lazy::new(|| grammar().expect("program grammar references only defined rules"));

/// Parse a program token stream (without sentinels).
pub fn parse_program(tokens: &[Token], source_len: usize) -> Result<Program, CompileError> {
    let program = PROGRAM_GRAMMAR
        .parse(tokens, source_len)?
        .into_program()
        .map_err(|err| GrammarError::Reduce {
            rule: "program".to_string(),
            message: err.message,
        })?;
    tracing::debug!(scopes = program.scopes.len(), "parsed program");
    Ok(program)
}

/// Values passed between program-language reducers.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramSyntax {
    Token(TokenValue),
    List(Vec<ProgramSyntax>),
    Program(Program),
    Scope(Scope),
    Definition(Definition),
    External(ExternalDefinition),
    Kind(CallableKind),
    Value(Value),
    Call(Call),
    Block(Block),
    Variable(VariableDef),
    Param(ParamDef),
    ExternalParam(ExternalParam),
    ExternalMember(ExternalPresetMember),
    Attribute(Attribute),
    Type(TypeRef),
    Dim(ArrayDim),
}

impl SemanticValue for ProgramSyntax {
    fn from_token(token: &Token) -> Self {
        ProgramSyntax::Token(token.value.clone())
    }

    fn from_list(items: Vec<Self>) -> Self {
        ProgramSyntax::List(items)
    }

    fn into_list(self) -> Result<Vec<Self>, ReduceError> {
        match self {
            ProgramSyntax::List(items) => Ok(items),
            other => Err(ReduceError::unexpected("List", &other)),
        }
    }
}

macro_rules! accessors {
    ($($method:ident => $variant:ident($ty:ty)),* $(,)?) => {
        impl ProgramSyntax {
            $(
                pub fn $method(self) -> Result<$ty, ReduceError> {
                    match self {
                        ProgramSyntax::$variant(value) => Ok(value),
                        other => Err(ReduceError::unexpected(stringify!($variant), &other)),
                    }
                }
            )*
        }
    };
}

accessors!(
    into_program => Program(Program),
    into_scope => Scope(Scope),
    into_definition => Definition(Definition),
    into_external => External(ExternalDefinition),
    into_kind => Kind(CallableKind),
    into_value => Value(Value),
    into_call => Call(Call),
    into_block => Block(Block),
    into_variable => Variable(VariableDef),
    into_param => Param(ParamDef),
    into_external_param => ExternalParam(ExternalParam),
    into_external_member => ExternalMember(ExternalPresetMember),
    into_attribute => Attribute(Attribute),
    into_type => Type(TypeRef),
    into_dim => Dim(ArrayDim),
);

impl ProgramSyntax {
    pub fn into_text(self) -> Result<String, ReduceError> {
        match self {
            ProgramSyntax::Token(TokenValue::Text(text)) => Ok(text),
            other => Err(ReduceError::unexpected("text token", &other)),
        }
    }

    pub fn into_int(self) -> Result<i64, ReduceError> {
        match self {
            ProgramSyntax::Token(TokenValue::Int(value)) => Ok(value),
            other => Err(ReduceError::unexpected("int token", &other)),
        }
    }

    pub fn into_bool(self) -> Result<bool, ReduceError> {
        match self {
            ProgramSyntax::Token(TokenValue::Bool(value)) => Ok(value),
            other => Err(ReduceError::unexpected("bool token", &other)),
        }
    }

    pub fn into_id(self) -> Result<ElementId, ReduceError> {
        let text = self.into_text()?;
        text.parse().map_err(|err| ReduceError::new(format!("{}", err)))
    }

    fn list<T>(self, item: fn(Self) -> Result<T, ReduceError>) -> Result<Vec<T>, ReduceError> {
        self.into_list()?.into_iter().map(item).collect()
    }
}

type Reduced = Result<ProgramSyntax, ReduceError>;

fn value(kind: ValueKind) -> Reduced {
    Ok(ProgramSyntax::Value(Value::new(kind)))
}

fn text_value(mut a: Args<ProgramSyntax>, kind: fn(String) -> ValueKind) -> Reduced {
    value(kind(a.next()?.into_text()?))
}

fn grammar() -> Result<Grammar<ProgramSyntax>, GrammarError> {
    let builder = GrammarBuilder::<ProgramSyntax>::new("program")
        .rule("program", &["sections"], |mut a| {
            let scopes = a.next()?.list(ProgramSyntax::into_scope)?;
            Ok(ProgramSyntax::Program(Program { scopes }))
        })
        .many("sections", "section")
        .alias("section", "import")
        .alias("section", "library")
        .rule("import", &["$import", "$str", "${", "ext_items", "$}"], |mut a| {
            let library = a.skip(1)?.next()?.into_text()?;
            let definitions = a.skip(1)?.next()?.list(ProgramSyntax::into_external)?;
            Ok(ProgramSyntax::Scope(Scope::Import(ImportScope {
                library,
                definitions,
            })))
        })
        .rule("library", &["$library", "$str", "${", "lib_items", "$}"], |mut a| {
            let library = a.skip(1)?.next()?.into_text()?;
            let definitions = a.skip(1)?.next()?.list(ProgramSyntax::into_definition)?;
            Ok(ProgramSyntax::Scope(Scope::Library(LibraryScope {
                library,
                definitions,
            })))
        })
        .many("ext_items", "ext_item")
        .many("lib_items", "lib_item");

    let builder = external_items(builder);
    let builder = library_items(builder);
    let builder = declarations(builder);
    let builder = values(builder);
    builder.build()
}

fn external_items(builder: GrammarBuilder<ProgramSyntax>) -> GrammarBuilder<ProgramSyntax> {
    builder
        .rule(
            "ext_item",
            &["attrs", "$preset", "$label", "${", "ext_members", "$}"],
            |mut a| {
                let attributes = a.next()?.list(ProgramSyntax::into_attribute)?;
                let name = a.skip(1)?.next()?.into_text()?;
                let members = a.skip(1)?.next()?.list(ProgramSyntax::into_external_member)?;
                Ok(ProgramSyntax::External(ExternalDefinition::Preset(
                    ExternalPreset {
                        attributes,
                        name,
                        members,
                        allocation: None,
                    },
                )))
            },
        )
        .rule(
            "ext_item",
            &[
                "attrs",
                "callable_kind",
                "$label",
                "$=",
                "$id",
                "$(",
                "ext_params",
                "$)",
                "ret",
                "$;",
            ],
            |mut a| {
                let attributes = a.next()?.list(ProgramSyntax::into_attribute)?;
                let kind = a.next()?.into_kind()?;
                let name = a.next()?.into_text()?;
                let id = a.skip(1)?.next()?.into_id()?;
                let params = a.skip(1)?.next()?.list(ProgramSyntax::into_external_param)?;
                let returns = a.skip(1)?.next()?.into_type()?;
                Ok(ProgramSyntax::External(ExternalDefinition::Function(
                    ExternalFunction {
                        kind,
                        attributes,
                        name,
                        id,
                        params,
                        returns,
                        allocation: None,
                    },
                )))
            },
        )
        .rule(
            "ext_item",
            &["attrs", "type", "$label", "$=", "$id", "$;"],
            |mut a| {
                let attributes = a.next()?.list(ProgramSyntax::into_attribute)?;
                let ty = a.next()?.into_type()?;
                let name = a.next()?.into_text()?;
                let id = a.skip(1)?.next()?.into_id()?;
                Ok(ProgramSyntax::External(ExternalDefinition::Variable(
                    ExternalVariable {
                        attributes,
                        ty,
                        name,
                        id,
                        allocation: None,
                    },
                )))
            },
        )
        .separated("ext_members", "ext_member", "$,")
        .rule("ext_member", &["$label", "$=", "$id"], |mut a| {
            let name = a.next()?.into_text()?;
            let id = a.skip(1)?.next()?.into_id()?;
            Ok(ProgramSyntax::ExternalMember(ExternalPresetMember {
                name,
                id,
                allocation: None,
            }))
        })
        .rule("callable_kind", &["$function"], |_| {
            Ok(ProgramSyntax::Kind(CallableKind::Function))
        })
        .rule("callable_kind", &["$action"], |_| {
            Ok(ProgramSyntax::Kind(CallableKind::Action))
        })
        .rule("callable_kind", &["$event"], |_| {
            Ok(ProgramSyntax::Kind(CallableKind::Event))
        })
        .separated("ext_params", "ext_param", "$,")
        .rule(
            "ext_param",
            &["attrs", "$label", "$:", "type", "$=", "$id"],
            |a| external_param(a, false),
        )
        .rule(
            "ext_param",
            &["attrs", "$label", "$:", "type", "$=", "$id", "$(", "value", "$)"],
            |a| external_param(a, true),
        )
}

fn external_param(mut a: Args<ProgramSyntax>, with_default: bool) -> Reduced {
    let attributes = a.next()?.list(ProgramSyntax::into_attribute)?;
    let name = a.next()?.into_text()?;
    let ty = a.skip(1)?.next()?.into_type()?;
    let id = a.skip(1)?.next()?.into_id()?;
    let default = if with_default {
        Some(a.skip(1)?.next()?.into_value()?)
    } else {
        None
    };
    Ok(ProgramSyntax::ExternalParam(ExternalParam {
        attributes,
        name,
        ty,
        id,
        default,
        allocation: None,
    }))
}

fn library_items(builder: GrammarBuilder<ProgramSyntax>) -> GrammarBuilder<ProgramSyntax> {
    builder
        .rule(
            "lib_item",
            &["attrs", "$preset", "$label", "$str", "${", "member_names", "$}"],
            |mut a| {
                let attributes = a.next()?.list(ProgramSyntax::into_attribute)?;
                let name = a.skip(1)?.next()?.into_text()?;
                let description = a.next()?.into_text()?;
                let members = a
                    .skip(1)?
                    .next()?
                    .list(ProgramSyntax::into_text)?
                    .into_iter()
                    .map(|name| PresetMember {
                        name,
                        allocation: None,
                    })
                    .collect();
                Ok(ProgramSyntax::Definition(Definition::Preset(PresetDef {
                    attributes,
                    name,
                    description,
                    members,
                    allocation: None,
                })))
            },
        )
        .separated("member_names", "$label", "$,")
        .rule(
            "lib_item",
            &[
                "attrs", "$function", "$label", "$str", "$(", "params", "$)", "ret", "locals",
                "block",
            ],
            |mut a| {
                let attributes = a.next()?.list(ProgramSyntax::into_attribute)?;
                let name = a.skip(1)?.next()?.into_text()?;
                let description = a.next()?.into_text()?;
                let params = a.skip(1)?.next()?.list(ProgramSyntax::into_param)?;
                let returns = a.skip(1)?.next()?.into_type()?;
                let body = merge_locals(a.next()?, a.next()?)?;
                Ok(ProgramSyntax::Definition(Definition::Function(FunctionDef {
                    kind: CallableKind::Function,
                    attributes,
                    name,
                    description,
                    params,
                    returns,
                    body,
                    allocation: None,
                })))
            },
        )
        .rule(
            "lib_item",
            &[
                "attrs", "$action", "$label", "$str", "$(", "params", "$)", "locals", "block",
            ],
            |mut a| {
                let attributes = a.next()?.list(ProgramSyntax::into_attribute)?;
                let name = a.skip(1)?.next()?.into_text()?;
                let description = a.next()?.into_text()?;
                let params = a.skip(1)?.next()?.list(ProgramSyntax::into_param)?;
                let body = merge_locals(a.skip(1)?.next()?, a.next()?)?;
                Ok(ProgramSyntax::Definition(Definition::Function(FunctionDef {
                    kind: CallableKind::Action,
                    attributes,
                    name,
                    description,
                    params,
                    returns: TypeRef::void(),
                    body,
                    allocation: None,
                })))
            },
        )
        .rule(
            "lib_item",
            &["attrs", "$trigger", "$label", "$str", "call", "locals", "block"],
            |mut a| {
                let attributes = a.next()?.list(ProgramSyntax::into_attribute)?;
                let name = a.skip(1)?.next()?.into_text()?;
                let description = a.next()?.into_text()?;
                let event = a.next()?.into_call()?;
                let body = merge_locals(a.next()?, a.next()?)?;
                Ok(ProgramSyntax::Definition(Definition::Trigger(TriggerDef {
                    attributes,
                    name,
                    description,
                    event,
                    body,
                    allocation: None,
                })))
            },
        )
        .rule("lib_item", &["variable"], |mut a| {
            Ok(ProgramSyntax::Definition(Definition::Variable(
                a.next()?.into_variable()?,
            )))
        })
        .many("locals", "variable")
        .separated("params", "param", "$,")
        .rule("param", &["attrs", "$label", "$:", "type"], |a| param(a, false))
        .rule("param", &["attrs", "$label", "$:", "type", "$=", "value"], |a| {
            param(a, true)
        })
        .rule("ret", &[], |_| Ok(ProgramSyntax::Type(TypeRef::void())))
        .rule("ret", &["$->", "type"], |mut a| a.skip(1)?.next())
}

/// Locals declared between the signature and the body come first.
fn merge_locals(locals: ProgramSyntax, block: ProgramSyntax) -> Result<Block, ReduceError> {
    let mut merged = locals.list(ProgramSyntax::into_variable)?;
    let block = block.into_block()?;
    merged.extend(block.locals);
    Ok(Block {
        locals: merged,
        statements: block.statements,
    })
}

fn param(mut a: Args<ProgramSyntax>, with_default: bool) -> Reduced {
    let attributes = a.next()?.list(ProgramSyntax::into_attribute)?;
    let name = a.next()?.into_text()?;
    let ty = a.skip(1)?.next()?.into_type()?;
    let default = if with_default {
        Some(a.skip(1)?.next()?.into_value()?)
    } else {
        None
    };
    Ok(ProgramSyntax::Param(ParamDef {
        attributes,
        name,
        ty,
        default,
        allocation: None,
    }))
}

fn declarations(builder: GrammarBuilder<ProgramSyntax>) -> GrammarBuilder<ProgramSyntax> {
    builder
        .rule(
            "variable",
            &["attrs", "type", "$label", "$=", "value", "$;"],
            |mut a| {
                let attributes = a.next()?.list(ProgramSyntax::into_attribute)?;
                let ty = a.next()?.into_type()?;
                let name = a.next()?.into_text()?;
                let value = a.skip(1)?.next()?.into_value()?;
                Ok(ProgramSyntax::Variable(VariableDef {
                    attributes,
                    ty,
                    name,
                    value,
                    allocation: None,
                }))
            },
        )
        .rule("type", &["$label", "dims"], |mut a| {
            let name = a.next()?.into_text()?;
            let dims = a.next()?.list(ProgramSyntax::into_dim)?;
            Ok(ProgramSyntax::Type(TypeRef { name, dims }))
        })
        .many("dims", "dim")
        .rule("dim", &["$[", "$int", "$]"], |mut a| {
            Ok(ProgramSyntax::Dim(ArrayDim::Size(a.skip(1)?.next()?.into_int()?)))
        })
        .rule("dim", &["$[", "$label", "$]"], |mut a| {
            Ok(ProgramSyntax::Dim(ArrayDim::Variable(
                a.skip(1)?.next()?.into_text()?,
            )))
        })
        .rule("attrs", &[], |_| Ok(ProgramSyntax::List(Vec::new())))
        .rule("attrs", &["$[", "attr_list", "$]"], |mut a| a.skip(1)?.next())
        .separated("attr_list", "attribute", "$,")
        .rule("attribute", &["$label"], |mut a| {
            Ok(ProgramSyntax::Attribute(Attribute::flag(a.next()?.into_text()?)))
        })
        .rule("attribute", &["$label", "$=", "$str"], |mut a| {
            let key = a.next()?.into_text()?;
            let value = a.skip(1)?.next()?.into_text()?;
            Ok(ProgramSyntax::Attribute(Attribute::with_value(key, value)))
        })
}

fn values(builder: GrammarBuilder<ProgramSyntax>) -> GrammarBuilder<ProgramSyntax> {
    builder
        .rule("block", &["${", "block_locals", "statements", "$}"], |mut a| {
            let locals = a.skip(1)?.next()?.list(ProgramSyntax::into_variable)?;
            let statements = a.next()?.list(ProgramSyntax::into_call)?;
            Ok(ProgramSyntax::Block(Block { locals, statements }))
        })
        .many("block_locals", "variable")
        .many("statements", "statement")
        .rule("statement", &["call", "$;"], |mut a| a.next())
        .rule("call", &["$label", "$(", "args", "$)"], |mut a| {
            let callee = a.next()?.into_text()?;
            let args = a.skip(1)?.next()?.list(ProgramSyntax::into_value)?;
            Ok(ProgramSyntax::Call(Call::new(callee, args)))
        })
        .separated("args", "value", "$,")
        .rule("value", &["$text"], |a| text_value(a, ValueKind::Text))
        .rule("value", &["$str"], |a| text_value(a, ValueKind::String))
        .rule("value", &["$int"], |mut a| value(ValueKind::Int(a.next()?.into_int()?)))
        .rule("value", &["$bool"], |mut a| {
            value(ValueKind::Bool(a.next()?.into_bool()?))
        })
        .rule("value", &["$label", "$.", "$label"], |mut a| {
            let preset = a.next()?.into_text()?;
            let member = a.skip(1)?.next()?.into_text()?;
            value(ValueKind::PresetMember { preset, member })
        })
        .rule("value", &["$label"], |a| text_value(a, ValueKind::Variable))
        .rule("value", &["$label", "index", "indices"], |mut a| {
            let name = a.next()?.into_text()?;
            let first = a.next()?.into_value()?;
            let mut indices = a.next()?.list(ProgramSyntax::into_value)?;
            indices.insert(0, first);
            value(ValueKind::ArrayElement { name, indices })
        })
        .rule("value", &["call"], |mut a| value(ValueKind::Call(a.next()?.into_call()?)))
        .rule("value", &["block"], |mut a| {
            value(ValueKind::Block(a.next()?.into_block()?))
        })
        .many("indices", "index")
        .rule("index", &["$[", "value", "$]"], |mut a| a.skip(1)?.next())
}
