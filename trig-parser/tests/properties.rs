//! Whole-compiler properties: determinism, id monotonicity, scope precedence, library
//! tagging and catalog resolution.

use proptest::prelude::*;
use rstest::rstest;
use std::collections::HashMap;
use trig_parser::trig::allocation::Allocator;
use trig_parser::trig::building::TreeNode;
use trig_parser::trig::error::CompileError;
use trig_parser::trig::pipeline::Compiler;
use trig_parser::trig::testing::{elements, parse_program_source, samples};

fn compile(program: &str, catalog: &str) -> Result<TreeNode, CompileError> {
    Compiler::default()
        .compile_sources(program, catalog)
        .map(|output| output.tree)
}

fn definition_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::collection::vec("[G-Z][a-z]{0,5}", 1..4).prop_map(|members| format!(
            "preset P \"d\" {{ {} }}",
            members.join(", ")
        )),
        (0i64..1000).prop_map(|value| format!("int V = {};", value)),
        "[a-z ]{0,8}".prop_map(|text| format!("string S = concat(text\"{}\", 1);", text)),
    ]
}

fn program_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["0", "Alpha", "Beta"]),
            prop::collection::vec(definition_strategy(), 0..6),
        ),
        1..4,
    )
    .prop_map(|libraries| {
        libraries
            .into_iter()
            .map(|(name, definitions)| format!("library \"{}\" {{ {} }}\n", name, definitions.join(" ")))
            .collect()
    })
}

/// `(prefix, id)` of a string table key such as `Variable/Name/lib_Alpha_10000001`.
fn split_key(key: &str) -> (String, u32) {
    let tail = key.rsplit('/').next().unwrap();
    let (prefix, id) = tail.split_at(tail.len() - 8);
    (prefix.to_string(), u32::from_str_radix(id, 16).unwrap())
}

proptest! {
    #[test]
    fn allocation_is_deterministic(source in program_strategy()) {
        let mut first = Allocator::new();
        let mut second = Allocator::new();
        let a = first.allocate_program(parse_program_source(&source).unwrap());
        let b = second.allocate_program(parse_program_source(&source).unwrap());
        prop_assert_eq!(a, b);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn ids_increase_within_each_library(source in program_strategy()) {
        let mut allocator = Allocator::new();
        allocator.allocate_program(parse_program_source(&source).unwrap());

        let mut last: HashMap<String, u32> = HashMap::new();
        for (key, _) in allocator.labels().iter() {
            let (prefix, id) = split_key(key);
            if let Some(previous) = last.insert(prefix, id) {
                prop_assert!(previous < id, "{} does not follow {:08X}", key, previous);
            }
        }
    }
}

#[test]
fn parameters_shadow_globals_and_locals_shadow_globals() {
    let program = r#"import "Ntve" {
    event MapInit = 00000001 ();
    action Wait = 00000002 (seconds: int = 00000003);
}
library "0" {
    int n = 1;
    action Use "Use" (n: int) { Wait(n); }
    trigger Boot "Boot" MapInit()
        int n = 2;
    {
        Wait(n);
    }
}
"#;
    let tree = compile(program, "").unwrap();
    let global = elements(&tree, "Variable")[0].get_attr("Id").unwrap().to_string();

    let action = &elements(&tree, "FunctionDef")[0];
    let param = action.children_tagged("Parameter").next().unwrap();
    let trigger = &elements(&tree, "Trigger")[0];
    let local = trigger.children_tagged("Variable").next().unwrap();
    assert_ne!(local.get_attr("Id"), Some(global.as_str()));

    let args: Vec<&TreeNode> = elements(&tree, "Param")
        .into_iter()
        .filter(|param| param.children_tagged("ParameterDef").next().is_some())
        .collect();
    assert_eq!(args.len(), 2);

    let param_use = args[0].children_tagged("Parameter").next().unwrap();
    assert_eq!(param_use.get_attr("Type"), Some("ParamDef"));
    assert_eq!(param_use.get_attr("Id"), param.get_attr("Id"));

    let local_use = args[1].children_tagged("Variable").next().unwrap();
    assert_eq!(local_use.get_attr("Id"), local.get_attr("Id"));
}

#[test]
fn default_library_is_never_tagged() {
    let tree = compile(samples::FULL_PROGRAM, samples::FULL_CATALOG).unwrap();
    for node in tree.descendants() {
        assert_ne!(node.get_attr("Library"), Some("0"));
    }

    let quest = tree
        .children
        .iter()
        .find(|node| node.tag == "Library")
        .unwrap();
    assert_eq!(quest.get_attr("Id"), Some("Quest"));
    let quest_root = &quest.children[0];
    assert!(quest_root
        .children
        .iter()
        .all(|item| item.get_attr("Library") == Some("Quest")));

    // wrappers first, then the default library's root and elements
    let tags: Vec<&str> = tree.children.iter().map(|node| node.tag.as_str()).collect();
    assert_eq!(&tags[..2], &["Library", "Root"]);
    assert!(tags[2..].iter().all(|tag| *tag == "Element"));
}

#[rstest]
#[case::trigger("Boot")]
#[case::action("Greet")]
#[case::function("Double")]
#[case::preset("Stage")]
#[case::global("scores")]
#[case::imported_action("Wait")]
#[case::imported_global("Difficulty")]
fn catalog_leaves_resolve(#[case] name: &str) {
    let catalog = format!("library \"0\" \"Main\" {{ {} }}", name);
    assert!(compile(samples::FULL_PROGRAM, &catalog).is_ok());
}

#[test]
fn unknown_catalog_leaf_is_named() {
    let catalog = r#"library "0" "Main" { folder "Setup" { Boot, Missing } }"#;
    assert_eq!(
        compile(samples::FULL_PROGRAM, catalog).unwrap_err(),
        CompileError::UnknownDefinition {
            name: "Missing".to_string()
        }
    );
}

#[test]
fn unresolved_symbol_produces_no_tree() {
    let result = Compiler::default().compile_sources(samples::UNRESOLVED_PROGRAM, "");
    assert_eq!(result.unwrap_err(), CompileError::unresolved("x"));
}
