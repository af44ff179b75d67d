//! Assembling the `TriggerData` document
//!
//! Catalog libraries are walked first, in order, so every listed definition is lowered
//! where the catalog places it. Library definitions no catalog lists are lowered
//! afterwards and referenced from their own library's `Root`.
//!
//! Libraries other than `"0"` are wrapped in `Library Id=".."` in first-use order; the
//! `"0"` library's `Root` and elements come last, directly under `TriggerData`.

use super::lowering::Lowerer;
use super::symbols::SymbolTable;
use super::tree::TreeNode;
use crate::trig::ast::{Allocated, Catalog, Program, DEFAULT_LIBRARY};
use crate::trig::error::CompileError;

pub struct TreeBuilder<'a> {
    program: &'a Allocated<Program>,
    catalog: &'a Allocated<Catalog>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(program: &'a Allocated<Program>, catalog: &'a Allocated<Catalog>) -> Self {
        TreeBuilder { program, catalog }
    }

    pub fn build(&self) -> Result<TreeNode, CompileError> {
        let symbols = SymbolTable::new(self.program);
        let mut lowerer = Lowerer::new(&symbols);

        for library in &self.catalog.libraries {
            lowerer.touch(&library.name);
            for item in &library.items {
                let node = lowerer.catalog_item(item)?;
                lowerer.add_to_root(&library.name, node);
            }
        }

        for scope in self.program.libraries() {
            lowerer.touch(&scope.library);
            for definition in &scope.definitions {
                if lowerer.is_lowered(definition) {
                    continue;
                }
                let item = lowerer.definition(definition)?;
                lowerer.add_to_root(&scope.library, item);
            }
        }

        let mut document = TreeNode::new("TriggerData");
        let mut default_library = None;
        let mut element_count = 0;
        for (name, output) in lowerer.finish() {
            element_count += output.elements.len();
            if name == DEFAULT_LIBRARY {
                default_library = Some(output);
                continue;
            }
            let mut wrapper = TreeNode::new("Library")
                .attr("Id", name)
                .child(output.root);
            wrapper.children.extend(output.elements);
            document.children.push(wrapper);
        }
        if let Some(output) = default_library {
            document.children.push(output.root);
            document.children.extend(output.elements);
        }

        tracing::debug!(elements = element_count, "lowered tree");
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trig::building::MAX_DEPTH;
    use crate::trig::testing::{build, elements, samples};
    use std::collections::HashSet;

    fn build_ok(program: &str, catalog: &str) -> TreeNode {
        build(program, catalog).unwrap().0
    }

    fn calls_to<'t>(calls: &[&'t TreeNode], id: &str) -> Vec<&'t TreeNode> {
        calls
            .iter()
            .copied()
            .filter(|call| {
                call.children_tagged("FunctionDef")
                    .any(|def| def.get_attr("Id") == Some(id))
            })
            .collect()
    }

    fn ids(nodes: &[&TreeNode]) -> Vec<String> {
        nodes
            .iter()
            .map(|node| node.get_attr("Id").unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_preset_lowering() {
        let tree = build_ok(samples::PRESET_PROGRAM, samples::PRESET_CATALOG);

        let root = &tree.children[0];
        assert_eq!(root.tag, "Root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].get_attr("Type"), Some("Preset"));

        let presets = elements(&tree, "Preset");
        assert_eq!(presets.len(), 1);
        let members: Vec<&TreeNode> = presets[0].children_tagged("Item").collect();
        assert_eq!(ids(&members), vec!["10000002", "10000003"]);
        assert!(members
            .iter()
            .all(|item| item.get_attr("Type") == Some("PresetValue")));
        assert!(presets[0].children_tagged("PresetInteger").next().is_some());
        assert_eq!(elements(&tree, "PresetValue").len(), 2);

        assert!(tree
            .descendants()
            .iter()
            .all(|node| node.get_attr("Library").is_none()));
        assert!(tree.children.iter().all(|node| node.tag != "Library"));
    }

    #[test]
    fn test_unresolved_variable_aborts() {
        let err = build(samples::UNRESOLVED_PROGRAM, "").unwrap_err();
        assert_eq!(err, CompileError::unresolved("x"));
    }

    #[test]
    fn test_block_actual_lowers_to_sibling_calls() {
        let tree = build_ok(samples::BLOCK_PROGRAM, samples::BLOCK_CATALOG);

        // Repeat is the first definition: FunctionDef, then `times`, then `body`
        let body = tree.find_element("ParamDef", "10000003").unwrap();
        assert_eq!(
            body.children_tagged("ParameterType")
                .next()
                .and_then(|ty| ty.children.first())
                .and_then(|ty| ty.get_attr("Value")),
            Some("code")
        );

        let calls = elements(&tree, "FunctionCall");
        let tagged: Vec<&TreeNode> = calls
            .iter()
            .copied()
            .filter(|call| {
                call.children_tagged("SubFunctionType")
                    .any(|sub| sub.get_attr("Id") == Some("10000003"))
            })
            .collect();
        assert_eq!(tagged.len(), 3);

        let repeat = calls
            .iter()
            .find(|call| {
                call.children_tagged("FunctionDef")
                    .any(|def| def.get_attr("Id") == Some("10000001"))
            })
            .unwrap();
        assert_eq!(repeat.children_tagged("Parameter").count(), 1);
        assert_eq!(repeat.children_tagged("FunctionCall").count(), 3);
        assert_eq!(repeat.children_tagged("Variable").count(), 1);
    }

    #[test]
    fn test_block_locals_end_with_block() {
        let program = samples::BLOCK_PROGRAM.replace(
            "Wait(3);\n        });",
            "Wait(3);\n        });\n        Wait(step);",
        );
        let err = build(&program, samples::BLOCK_CATALOG).unwrap_err();
        assert_eq!(err, CompileError::unresolved("step"));
    }

    #[test]
    fn test_libraries_are_wrapped_and_default_spliced_last() {
        let tree = build_ok(samples::FULL_PROGRAM, samples::FULL_CATALOG);
        assert_eq!(tree.tag, "TriggerData");
        assert_eq!(tree.children[0].tag, "Library");
        assert_eq!(tree.children[0].get_attr("Id"), Some("Quest"));
        assert_eq!(tree.children[0].children[0].tag, "Root");
        assert_eq!(tree.children[1].tag, "Root");
        assert!(tree.children[2..].iter().all(|node| node.tag == "Element"));

        let stage = elements(&tree.children[0], "Preset");
        assert_eq!(stage.len(), 1);
        assert_eq!(stage[0].get_attr("Id"), Some("10000001"));
    }

    #[test]
    fn test_references_carry_library_outside_default() {
        let tree = build_ok(samples::FULL_PROGRAM, samples::FULL_CATALOG);
        let quest_root = &tree.children[0].children[0];
        let folder = &quest_root.children[0];
        assert_eq!(folder.get_attr("Type"), Some("Category"));
        assert_eq!(folder.get_attr("Library"), Some("Quest"));

        let waits: Vec<&TreeNode> = tree
            .descendants()
            .into_iter()
            .filter(|node| node.tag == "FunctionDef" && node.get_attr("Id") == Some("00000002"))
            .collect();
        assert!(!waits.is_empty());
        assert!(waits
            .iter()
            .all(|node| node.get_attr("Library") == Some("Ntve")));
    }

    #[test]
    fn test_each_definition_is_lowered_once() {
        let catalog = samples::FULL_CATALOG.replace("counter\n", "counter, Boot\n");
        let tree = build_ok(samples::FULL_PROGRAM, &catalog);
        assert_eq!(elements(&tree, "Trigger").len(), 2);

        let boot_refs = tree
            .descendants()
            .into_iter()
            .filter(|node| {
                node.tag == "Item"
                    && node.get_attr("Type") == Some("Trigger")
                    && node.get_attr("Library").is_none()
            })
            .count();
        assert_eq!(boot_refs, 2);

        for section in [&tree.children[0].children, &tree.children] {
            let mut seen = HashSet::new();
            for element in section.iter().filter(|node| node.tag == "Element") {
                let key = (element.get_attr("Type"), element.get_attr("Id"));
                assert!(seen.insert(key), "duplicate element {:?}", element.attributes);
            }
        }
    }

    #[test]
    fn test_unlisted_definitions_are_referenced_from_root() {
        let tree = build_ok(samples::FULL_PROGRAM, samples::FULL_CATALOG);
        let root = tree.children.iter().find(|node| node.tag == "Root").unwrap();
        let types: Vec<&str> = root
            .children
            .iter()
            .filter_map(|item| item.get_attr("Type"))
            .collect();
        // Setup folder, counter, then the unlisted scores and Double
        assert_eq!(types, vec!["Category", "Variable", "Variable", "FunctionDef"]);
    }

    #[test]
    fn test_omitted_defaults() {
        let tree = build_ok(samples::FULL_PROGRAM, samples::FULL_CATALOG);
        let calls = elements(&tree, "FunctionCall");

        // `Wait()` gets the imported default, `Wait(scores[local])` does not
        let waits = calls_to(&calls, "00000002");
        assert_eq!(waits.len(), 2);
        let defaults: Vec<&TreeNode> = waits
            .iter()
            .flat_map(|call| call.children_tagged("Default"))
            .collect();
        assert_eq!(defaults.len(), 1);
        let default = tree
            .find_element("Param", defaults[0].get_attr("Id").unwrap())
            .unwrap();
        let literal = default.children_tagged("Value").next().unwrap();
        assert_eq!(literal.text.as_deref(), Some("1"));

        // both `Say` calls omit `tint` and share one lowered default
        let says = calls_to(&calls, "00000004");
        let tint_ids: HashSet<&str> = says
            .iter()
            .flat_map(|call| call.children_tagged("Default"))
            .filter_map(|node| node.get_attr("Id"))
            .collect();
        assert_eq!(says.len(), 2);
        assert_eq!(tint_ids.len(), 1);

        // `Greet()` omits a library formal: nothing emitted at the call site
        let greet_def = elements(&tree, "FunctionDef")
            .into_iter()
            .find(|def| def.children_tagged("FlagAction").next().is_some())
            .unwrap();
        let greet_id = greet_def.get_attr("Id").unwrap();
        let greets = calls_to(&calls, greet_id);
        assert_eq!(greets.len(), 2);
        assert!(greets
            .iter()
            .all(|call| call.children_tagged("Default").next().is_none()));
        let who = greet_def.children_tagged("Parameter").next().unwrap();
        let who_def = tree
            .find_element("ParamDef", who.get_attr("Id").unwrap())
            .unwrap();
        assert!(who_def.children_tagged("Default").next().is_some());
    }

    #[test]
    fn test_external_leaf_is_only_referenced() {
        let catalog = r#"library "0" "Main" { Wait, Difficulty }"#;
        let tree = build_ok(samples::FULL_PROGRAM, catalog);
        let root = tree.children.iter().find(|node| node.tag == "Root").unwrap();
        assert_eq!(root.children[0].get_attr("Id"), Some("00000002"));
        assert_eq!(root.children[0].get_attr("Library"), Some("Ntve"));
        assert_eq!(root.children[1].get_attr("Type"), Some("Variable"));
        assert!(tree.find_element("FunctionDef", "00000002").is_none());
    }

    #[test]
    fn test_unknown_catalog_entry() {
        let err = build(samples::PRESET_PROGRAM, r#"library "0" "Main" { Nope }"#).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownDefinition {
                name: "Nope".to_string()
            }
        );
    }

    #[test]
    fn test_imported_preset_cannot_be_listed() {
        let err = build(samples::FULL_PROGRAM, r#"library "0" "Main" { Color }"#).unwrap_err();
        assert!(matches!(err, CompileError::Shape { .. }));
    }

    #[test]
    fn test_call_shape_errors() {
        let too_many = samples::BLOCK_PROGRAM.replace("Wait(2);", "Wait(2, 3);");
        assert!(matches!(
            build(&too_many, "").unwrap_err(),
            CompileError::Shape { .. }
        ));

        let missing = samples::BLOCK_PROGRAM.replace("Wait(2);", "Wait();");
        assert_eq!(
            build(&missing, "").unwrap_err(),
            CompileError::shape("call to `Wait` is missing argument `seconds`")
        );

        let block_to_value = samples::BLOCK_PROGRAM.replace("Wait(2);", "Wait({ });");
        assert!(matches!(
            build(&block_to_value, "").unwrap_err(),
            CompileError::Shape { .. }
        ));

        let value_to_block = r#"library "0" {
    action Repeat "Repeat" (times: int, [block] body: code) { }
    action Run "Run" () { Repeat(3, 4); }
}
"#;
        assert_eq!(
            build(value_to_block, "").unwrap_err(),
            CompileError::shape("parameter `body` of `Repeat` expects a statement block")
        );
    }

    #[test]
    fn test_nesting_beyond_the_bound_is_rejected() {
        let depth = MAX_DEPTH + 20;
        let program = format!(
            "import \"Ntve\" {{ function Same = 00000002 (n: int = 00000003) -> int; }}\n\
             library \"0\" {{ int x = {}1{}; }}",
            "Same(".repeat(depth),
            ")".repeat(depth)
        );
        // deep recursion in parsing and lowering needs more than the default test stack
        let result = std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(move || build(&program, "").map(|_| ()))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(
            result.unwrap_err(),
            CompileError::shape(format!("expression nesting exceeds {} levels", MAX_DEPTH))
        );
    }

    #[test]
    fn test_malformed_attribute() {
        let program = samples::PRESET_PROGRAM.replace("preset", "[const] preset");
        assert_eq!(
            build(&program, "").unwrap_err(),
            CompileError::shape("malformed attribute `const` on `Colors`")
        );
    }
}
