//! Lowering definitions into `Element` nodes
//!
//! Every lowered node is appended to the element pool of its own library while the parent
//! keeps only reference nodes to it. A parent reserves its pool slot before lowering its
//! children, so pools list parents before the elements they point at.
//!
//! Reference shapes:
//!
//! - values become `Param` elements; the parent points at them with `Parameter`, `Value`,
//!   `Array` or `Default` references of type `Param`
//! - calls become `FunctionCall` elements; statements are `Action` (in triggers) or
//!   `FunctionCall` references, the trigger event an `Event` reference
//! - a block passed to a `[block]` parameter is not a value: each of its statements becomes
//!   a sibling `FunctionCall` element tagged with a `SubFunctionType` reference to that
//!   parameter, and its locals become `Variable` elements visible only inside the block

use super::scope::{Binding, ScopeContext};
use super::symbols::{CallableRef, Entry, Formal, GlobalRef, PresetRef, SymbolTable};
use super::tree::TreeNode;
use crate::trig::ast::program::{attribute_value, has_flag};
use crate::trig::ast::{
    Allocatable, Allocation, ArrayDim, Attribute, Block, Call, CallableKind, CatalogItem,
    Definition, FunctionDef, PresetDef, TriggerDef, TypeRef, Value, ValueKind, VariableDef,
};
use crate::trig::error::CompileError;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Deepest value/call nesting accepted during lowering.
pub const MAX_DEPTH: usize = 256;

/// The `Root` and element pool of one library.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryOutput {
    pub root: TreeNode,
    pub elements: Vec<TreeNode>,
}

pub struct Lowerer<'t, 'a> {
    symbols: &'t SymbolTable<'a>,
    libraries: IndexMap<String, LibraryOutput>,
    lowered: HashSet<Allocation>,
}

impl<'t, 'a> Lowerer<'t, 'a> {
    pub fn new(symbols: &'t SymbolTable<'a>) -> Self {
        Lowerer {
            symbols,
            libraries: IndexMap::new(),
            lowered: HashSet::new(),
        }
    }

    /// Libraries in first-use order.
    pub fn finish(self) -> IndexMap<String, LibraryOutput> {
        self.libraries
    }

    pub fn touch(&mut self, library: &str) -> &mut LibraryOutput {
        self.libraries
            .entry(library.to_string())
            .or_insert_with(|| LibraryOutput {
                root: TreeNode::new("Root"),
                elements: Vec::new(),
            })
    }

    pub fn add_to_root(&mut self, library: &str, item: TreeNode) {
        self.touch(library).root.children.push(item);
    }

    pub fn is_lowered(&self, definition: &Definition) -> bool {
        definition
            .allocation()
            .is_some_and(|allocation| self.lowered.contains(allocation))
    }

    fn reserve(&mut self, library: &str) -> usize {
        let elements = &mut self.touch(library).elements;
        elements.push(TreeNode::default());
        elements.len() - 1
    }

    fn fill(&mut self, library: &str, slot: usize, element: TreeNode) {
        let elements = &mut self.touch(library).elements;
        elements[slot] = element;
    }

    /// Catalog position: an `Item` reference, lowering whatever it names.
    pub fn catalog_item(&mut self, item: &CatalogItem) -> Result<TreeNode, CompileError> {
        match item {
            CatalogItem::Leaf(name) => self.leaf(name),
            CatalogItem::Folder(folder) => {
                let allocation = folder.allocated()?;
                let slot = self.reserve(&allocation.library);
                let mut element = TreeNode::element("Category", allocation.id);
                for child in &folder.items {
                    let node = self.catalog_item(child)?;
                    element.children.push(node);
                }
                self.fill(&allocation.library, slot, element);
                Ok(TreeNode::reference("Item", "Category", allocation))
            }
        }
    }

    fn leaf(&mut self, name: &str) -> Result<TreeNode, CompileError> {
        let entry = self
            .symbols
            .entry(name)
            .ok_or_else(|| CompileError::UnknownDefinition {
                name: name.to_string(),
            })?;
        match entry {
            Entry::Trigger(trigger) => self.trigger(trigger),
            Entry::Callable(CallableRef::Library(function)) => self.function(function),
            Entry::Callable(CallableRef::External(function)) => Ok(TreeNode::reference(
                "Item",
                "FunctionDef",
                function.allocated()?,
            )),
            Entry::Preset(PresetRef::Library(preset)) => self.preset(preset),
            Entry::Preset(PresetRef::External(_)) => Err(CompileError::shape(format!(
                "imported preset `{}` has no id of its own and cannot be listed",
                name
            ))),
            Entry::Global(GlobalRef::Library(variable)) => self.global(variable),
            Entry::Global(GlobalRef::External(variable)) => Ok(TreeNode::reference(
                "Item",
                "Variable",
                variable.allocated()?,
            )),
        }
    }

    /// Lower a library definition (once) and return the `Item` reference to it.
    pub fn definition(&mut self, definition: &Definition) -> Result<TreeNode, CompileError> {
        match definition {
            Definition::Trigger(trigger) => self.trigger(trigger),
            Definition::Function(function) => self.function(function),
            Definition::Preset(preset) => self.preset(preset),
            Definition::Variable(variable) => self.global(variable),
        }
    }

    fn trigger(&mut self, trigger: &TriggerDef) -> Result<TreeNode, CompileError> {
        let allocation = trigger.allocated()?;
        let item = TreeNode::reference("Item", "Trigger", allocation);
        if !self.lowered.insert(allocation.clone()) {
            return Ok(item);
        }
        validate(
            &trigger.attributes,
            &["disabled", "initially_off"],
            &[],
            &trigger.name,
        )?;

        let slot = self.reserve(&allocation.library);
        let mut element = TreeNode::element("Trigger", allocation.id);
        flags(
            &mut element,
            &trigger.attributes,
            &[("disabled", "FlagDisabled"), ("initially_off", "FlagInitialOff")],
        );
        comment(&mut element, &trigger.attributes);

        let mut scope = ScopeContext::new();
        let event = self.call(&trigger.event, &mut scope, None, 0)?;
        element
            .children
            .push(TreeNode::reference("Event", "FunctionCall", &event));
        self.body(&trigger.body, "Action", &mut scope, &mut element)?;

        self.fill(&allocation.library, slot, element);
        Ok(item)
    }

    fn function(&mut self, function: &FunctionDef) -> Result<TreeNode, CompileError> {
        let allocation = function.allocated()?;
        let item = TreeNode::reference("Item", "FunctionDef", allocation);
        if !self.lowered.insert(allocation.clone()) {
            return Ok(item);
        }
        validate(&function.attributes, &["hidden", "native"], &[], &function.name)?;

        let slot = self.reserve(&allocation.library);
        let mut element = TreeNode::element("FunctionDef", allocation.id);
        element.children.push(TreeNode::new(match function.kind {
            CallableKind::Action => "FlagAction",
            CallableKind::Function | CallableKind::Event => "FlagCall",
        }));
        flags(
            &mut element,
            &function.attributes,
            &[("hidden", "FlagHidden"), ("native", "FlagNative")],
        );
        comment(&mut element, &function.attributes);

        let mut scope = ScopeContext::new();
        if !function.returns.is_void() {
            let returns = self.type_node("ReturnType", &function.returns, &scope)?;
            element.children.push(returns);
        }
        for param in &function.params {
            validate(&param.attributes, &["block"], &[], &param.name)?;
            let param_allocation = param.allocated()?;
            let param_slot = self.reserve(&param_allocation.library);
            let mut param_element = TreeNode::element("ParamDef", param_allocation.id);
            comment(&mut param_element, &param.attributes);
            let ty = self.type_node("ParameterType", &param.ty, &scope)?;
            param_element.children.push(ty);
            if let Some(default) = &param.default {
                let value = self.value(default, None, &mut ScopeContext::new(), 0)?;
                param_element
                    .children
                    .push(TreeNode::reference("Default", "Param", &value));
            }
            self.fill(&param_allocation.library, param_slot, param_element);

            scope.add_parameter(&param.name, param_allocation);
            element
                .children
                .push(TreeNode::reference("Parameter", "ParamDef", param_allocation));
        }
        self.body(&function.body, "FunctionCall", &mut scope, &mut element)?;

        self.fill(&allocation.library, slot, element);
        Ok(item)
    }

    /// Locals then statements of a trigger or function body.
    fn body(
        &mut self,
        body: &Block,
        statement_tag: &str,
        scope: &mut ScopeContext,
        element: &mut TreeNode,
    ) -> Result<(), CompileError> {
        for local in &body.locals {
            let local_allocation = self.variable(local, scope, 0)?;
            scope.add_local(&local.name, &local_allocation);
            element
                .children
                .push(TreeNode::reference("Variable", "Variable", &local_allocation));
        }
        for statement in &body.statements {
            let call = self.call(statement, scope, None, 0)?;
            element
                .children
                .push(TreeNode::reference(statement_tag, "FunctionCall", &call));
        }
        Ok(())
    }

    fn preset(&mut self, preset: &PresetDef) -> Result<TreeNode, CompileError> {
        let allocation = preset.allocated()?;
        let item = TreeNode::reference("Item", "Preset", allocation);
        if !self.lowered.insert(allocation.clone()) {
            return Ok(item);
        }
        validate(&preset.attributes, &[], &["base"], &preset.name)?;

        let base = attribute_value(&preset.attributes, "base").unwrap_or("int");
        let mut element = TreeNode::element("Preset", allocation.id);
        comment(&mut element, &preset.attributes);
        if base == "int" {
            element.children.push(TreeNode::new("PresetInteger"));
        }
        element
            .children
            .push(TreeNode::new("BaseType").attr("Value", base));
        element.children.push(TreeNode::new("PresetGenConstVar"));

        let mut members = Vec::with_capacity(preset.members.len());
        for member in &preset.members {
            let member_allocation = member.allocated()?;
            element
                .children
                .push(TreeNode::reference("Item", "PresetValue", member_allocation));
            members.push(TreeNode::element("PresetValue", member_allocation.id));
        }

        let output = self.touch(&allocation.library);
        output.elements.push(element);
        output.elements.extend(members);
        Ok(item)
    }

    fn global(&mut self, variable: &VariableDef) -> Result<TreeNode, CompileError> {
        let allocation = variable.allocated()?;
        let item = TreeNode::reference("Item", "Variable", allocation);
        if self.lowered.insert(allocation.clone()) {
            self.variable(variable, &mut ScopeContext::new(), 0)?;
        }
        Ok(item)
    }

    fn variable(
        &mut self,
        variable: &VariableDef,
        scope: &mut ScopeContext,
        depth: usize,
    ) -> Result<Allocation, CompileError> {
        let allocation = variable.allocated()?;
        validate(&variable.attributes, &["const"], &[], &variable.name)?;

        let slot = self.reserve(&allocation.library);
        let mut element = TreeNode::element("Variable", allocation.id);
        flags(&mut element, &variable.attributes, &[("const", "FlagConstant")]);
        comment(&mut element, &variable.attributes);
        let ty = self.type_node("VariableType", &variable.ty, scope)?;
        element.children.push(ty);
        let value = self.value(&variable.value, None, scope, depth + 1)?;
        element
            .children
            .push(TreeNode::reference("Value", "Param", &value));

        self.fill(&allocation.library, slot, element);
        Ok(allocation.clone())
    }

    fn type_node(
        &self,
        tag: &str,
        ty: &TypeRef,
        scope: &ScopeContext,
    ) -> Result<TreeNode, CompileError> {
        let mut node = TreeNode::new(tag).child(TreeNode::new("Type").attr("Value", &ty.name));
        for (dim, size) in ty.dims.iter().enumerate() {
            let child = match size {
                ArrayDim::Size(size) => TreeNode::new("ArraySize")
                    .attr("Dim", dim.to_string())
                    .attr("Value", size.to_string()),
                ArrayDim::Variable(name) => {
                    let binding = scope.resolve(name, self.symbols)?;
                    let mut reference = binding_reference("ArraySizeVariable", &binding);
                    reference
                        .attributes
                        .insert(0, ("Dim".to_string(), dim.to_string()));
                    reference
                }
            };
            node.children.push(child);
        }
        Ok(node)
    }

    /// Lower a value into a `Param` element and return its allocation.
    fn value(
        &mut self,
        value: &Value,
        formal: Option<&Formal<'_>>,
        scope: &mut ScopeContext,
        depth: usize,
    ) -> Result<Allocation, CompileError> {
        check_depth(depth)?;
        let allocation = value.allocated()?;
        let slot = self.reserve(&allocation.library);
        let mut element = TreeNode::element("Param", allocation.id);
        if let Some(target) = formal.and_then(|formal| formal.allocation) {
            element
                .children
                .push(TreeNode::reference("ParameterDef", "ParamDef", target));
        }

        match &value.kind {
            ValueKind::Text(_) => {
                element
                    .children
                    .push(TreeNode::new("ValueType").attr("Type", "text"));
            }
            ValueKind::String(text) => push_literal(&mut element, text, "string"),
            ValueKind::Int(number) => push_literal(&mut element, &number.to_string(), "int"),
            ValueKind::Bool(flag) => push_literal(&mut element, &flag.to_string(), "bool"),
            ValueKind::Variable(name) => {
                let binding = scope.resolve(name, self.symbols)?;
                let (tag, _) = binding.reference_kind();
                element.children.push(binding_reference(tag, &binding));
            }
            ValueKind::PresetMember { preset, member } => {
                let target = self
                    .symbols
                    .preset(preset)?
                    .member(member)
                    .ok_or_else(|| CompileError::unresolved(format!("{}.{}", preset, member)))?;
                element
                    .children
                    .push(TreeNode::reference("Preset", "PresetValue", target));
            }
            ValueKind::ArrayElement { name, indices } => {
                let binding = scope.resolve(name, self.symbols)?;
                let (tag, _) = binding.reference_kind();
                element.children.push(binding_reference(tag, &binding));
                for index in indices {
                    let index = self.value(index, None, scope, depth + 1)?;
                    element
                        .children
                        .push(TreeNode::reference("Array", "Param", &index));
                }
            }
            ValueKind::Call(call) => {
                let call = self.call(call, scope, None, depth + 1)?;
                element
                    .children
                    .push(TreeNode::reference("FunctionCall", "FunctionCall", &call));
            }
            ValueKind::Block(_) => {
                return Err(CompileError::shape(
                    "a statement block can only be passed to a block parameter",
                ))
            }
        }

        self.fill(&allocation.library, slot, element);
        Ok(allocation.clone())
    }

    /// Lower a call into a `FunctionCall` element and return its allocation.
    ///
    /// `block_formal` is set for statements of a block actual and names the formal the
    /// block was passed to.
    fn call(
        &mut self,
        call: &Call,
        scope: &mut ScopeContext,
        block_formal: Option<&Allocation>,
        depth: usize,
    ) -> Result<Allocation, CompileError> {
        check_depth(depth)?;
        let callee = self.symbols.callable(&call.callee)?;
        let formals = callee.formals();
        if call.args.len() > formals.len() {
            return Err(CompileError::shape(format!(
                "`{}` takes {} argument(s) but {} were given",
                callee.name(),
                formals.len(),
                call.args.len()
            )));
        }
        let omitted = &formals[call.args.len()..];
        if let Some(missing) = omitted.iter().find(|formal| !formal.has_default) {
            return Err(CompileError::shape(format!(
                "call to `{}` is missing argument `{}`",
                callee.name(),
                missing.name
            )));
        }

        let allocation = call.allocated()?;
        let target = callee
            .allocation()
            .ok_or_else(|| CompileError::shape(format!("`{}` has no id", callee.name())))?;
        let slot = self.reserve(&allocation.library);
        let mut element = TreeNode::element("FunctionCall", allocation.id);
        element
            .children
            .push(TreeNode::reference("FunctionDef", "FunctionDef", target));
        if let Some(formal) = block_formal {
            element
                .children
                .push(TreeNode::reference("SubFunctionType", "ParamDef", formal));
        }

        for (arg, formal) in call.args.iter().zip(&formals) {
            match (&arg.kind, formal.accepts_block) {
                (ValueKind::Block(block), true) => {
                    let formal_allocation = formal.allocation.ok_or_else(|| {
                        CompileError::shape(format!("parameter `{}` has no id", formal.name))
                    })?;
                    scope.open_block();
                    let lowered =
                        self.block_actual(block, formal_allocation, scope, &mut element, depth + 1);
                    scope.close_block();
                    lowered?;
                }
                (ValueKind::Block(_), false) => {
                    return Err(CompileError::shape(format!(
                        "parameter `{}` of `{}` does not accept a statement block",
                        formal.name,
                        callee.name()
                    )))
                }
                (_, true) => {
                    return Err(CompileError::shape(format!(
                        "parameter `{}` of `{}` expects a statement block",
                        formal.name,
                        callee.name()
                    )))
                }
                _ => {
                    let value = self.value(arg, Some(formal), scope, depth + 1)?;
                    element
                        .children
                        .push(TreeNode::reference("Parameter", "Param", &value));
                }
            }
        }

        for formal in omitted {
            if let Some(default) = formal.external_default {
                let value = self.external_default(default, formal)?;
                element
                    .children
                    .push(TreeNode::reference("Default", "Param", &value));
            }
        }

        self.fill(&allocation.library, slot, element);
        Ok(allocation.clone())
    }

    fn block_actual(
        &mut self,
        block: &Block,
        formal: &Allocation,
        scope: &mut ScopeContext,
        element: &mut TreeNode,
        depth: usize,
    ) -> Result<(), CompileError> {
        for local in &block.locals {
            let local_allocation = self.variable(local, scope, depth)?;
            scope.add_local(&local.name, &local_allocation);
            element
                .children
                .push(TreeNode::reference("Variable", "Variable", &local_allocation));
        }
        for statement in &block.statements {
            let call = self.call(statement, scope, Some(formal), depth)?;
            element
                .children
                .push(TreeNode::reference("FunctionCall", "FunctionCall", &call));
        }
        Ok(())
    }

    /// The default of an imported parameter is lowered once and shared by every call
    /// that omits it.
    fn external_default(
        &mut self,
        default: &Value,
        formal: &Formal<'_>,
    ) -> Result<Allocation, CompileError> {
        let allocation = default.allocated()?;
        if self.lowered.insert(allocation.clone()) {
            self.value(default, Some(formal), &mut ScopeContext::new(), 0)?;
        }
        Ok(allocation.clone())
    }
}

fn binding_reference(tag: &str, binding: &Binding) -> TreeNode {
    let (_, ty) = binding.reference_kind();
    TreeNode::reference(tag, ty, binding.allocation())
}

fn push_literal(element: &mut TreeNode, text: &str, ty: &str) {
    element.children.push(TreeNode::new("Value").text(text));
    element
        .children
        .push(TreeNode::new("ValueType").attr("Type", ty));
}

fn check_depth(depth: usize) -> Result<(), CompileError> {
    if depth > MAX_DEPTH {
        return Err(CompileError::shape(format!(
            "expression nesting exceeds {} levels",
            MAX_DEPTH
        )));
    }
    Ok(())
}

/// `comment="..."` is accepted everywhere; anything else must be listed.
fn validate(
    attributes: &[Attribute],
    flags: &[&str],
    valued: &[&str],
    owner: &str,
) -> Result<(), CompileError> {
    for attribute in attributes {
        let key = attribute.key.as_str();
        let accepted = match attribute.value {
            None => flags.contains(&key),
            Some(_) => key == "comment" || valued.contains(&key),
        };
        if !accepted {
            return Err(CompileError::shape(format!(
                "malformed attribute `{}` on `{}`",
                key, owner
            )));
        }
    }
    Ok(())
}

fn flags(element: &mut TreeNode, attributes: &[Attribute], mapping: &[(&str, &str)]) {
    for (key, tag) in mapping {
        if has_flag(attributes, key) {
            element.children.push(TreeNode::new(*tag));
        }
    }
}

fn comment(element: &mut TreeNode, attributes: &[Attribute]) {
    if let Some(text) = attribute_value(attributes, "comment") {
        element.children.push(TreeNode::new("Comment").text(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_attributes() {
        let ok = [Attribute::flag("const"), Attribute::with_value("comment", "c")];
        assert!(validate(&ok, &["const"], &[], "x").is_ok());

        let flag_with_value = [Attribute::with_value("const", "yes")];
        assert_eq!(
            validate(&flag_with_value, &["const"], &[], "x"),
            Err(CompileError::shape("malformed attribute `const` on `x`"))
        );

        let bare_comment = [Attribute::flag("comment")];
        assert!(validate(&bare_comment, &[], &[], "x").is_err());

        let unknown = [Attribute::flag("weird")];
        assert!(validate(&unknown, &["const"], &[], "x").is_err());
    }

    #[test]
    fn test_depth_bound() {
        assert!(check_depth(MAX_DEPTH).is_ok());
        assert!(check_depth(MAX_DEPTH + 1).is_err());
    }
}
