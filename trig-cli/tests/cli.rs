use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;
use trig_parser::trig::testing::samples;

fn project(program: &str, catalog: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.trig"), program).unwrap();
    fs::write(dir.path().join("main.cat"), catalog).unwrap();
    dir
}

#[test]
fn compile_writes_three_outputs() {
    let dir = project(samples::PRESET_PROGRAM, samples::PRESET_CATALOG);
    let mut cmd = cargo_bin_cmd!("trig");
    cmd.current_dir(dir.path()).arg("main.trig").arg("main.cat");
    cmd.assert().success();

    let tree = fs::read_to_string(dir.path().join("out/Triggers")).unwrap();
    assert!(tree.starts_with("<?xml"));
    assert!(tree.contains(r#"<Element Type="Preset" Id="10000001">"#));
    let labels = fs::read_to_string(dir.path().join("out/TriggerStrings.txt")).unwrap();
    assert!(labels.starts_with("Preset/Name/10000001=Colors"));
    assert!(dir.path().join("out/GameStrings.txt").exists());
    assert!(dir.path().join("main.trig.cache").exists());
}

#[test]
fn output_dir_and_no_cache_flags() {
    let dir = project(samples::PRESET_PROGRAM, samples::PRESET_CATALOG);
    let mut cmd = cargo_bin_cmd!("trig");
    cmd.current_dir(dir.path())
        .args(["main.trig", "main.cat", "-o", "build", "--no-cache"]);
    cmd.assert().success();

    assert!(dir.path().join("build/Triggers").exists());
    assert!(!dir.path().join("main.trig.cache").exists());
}

#[test]
fn local_config_file_is_honored() {
    let dir = project(samples::PRESET_PROGRAM, samples::PRESET_CATALOG);
    fs::write(
        dir.path().join("trig.toml"),
        "[output]\ntree = \"Triggers.xml\"\nxml_declaration = false\n",
    )
    .unwrap();
    let mut cmd = cargo_bin_cmd!("trig");
    cmd.current_dir(dir.path()).args(["main.trig", "main.cat"]);
    cmd.assert().success();

    let tree = fs::read_to_string(dir.path().join("out/Triggers.xml")).unwrap();
    assert!(tree.starts_with("<TriggerData>"));
}

#[test]
fn emit_tokens_json() {
    let dir = project(samples::PRESET_PROGRAM, samples::PRESET_CATALOG);
    let mut cmd = cargo_bin_cmd!("trig");
    cmd.current_dir(dir.path())
        .args(["main.trig", "main.cat", "--emit", "tokens-json"]);
    cmd.assert().success().stdout(
        predicate::str::contains(r#""name": "library""#)
            .and(predicate::str::contains(r#""raw": "Colors""#)),
    );
}

#[test]
fn emit_ast_json() {
    let dir = project(samples::PRESET_PROGRAM, samples::PRESET_CATALOG);
    let mut cmd = cargo_bin_cmd!("trig");
    cmd.current_dir(dir.path())
        .args(["main.trig", "main.cat", "--emit", "ast-json"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Colors").and(predicate::str::contains("Green")));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn unresolved_symbol_fails_with_diagnostic() {
    let dir = project(samples::UNRESOLVED_PROGRAM, "");
    let mut cmd = cargo_bin_cmd!("trig");
    cmd.current_dir(dir.path()).args(["main.trig", "main.cat"]);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("main.trig: Unresolved symbol `x`"));
    assert!(!dir.path().join("out/Triggers").exists());
}

#[test]
fn parse_error_shows_source_excerpt() {
    let dir = project("library \"0\" {\n    int x = ;\n}\n", "");
    let mut cmd = cargo_bin_cmd!("trig");
    cmd.current_dir(dir.path()).args(["main.trig", "main.cat"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("int x = ;"));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = project(samples::PRESET_PROGRAM, samples::PRESET_CATALOG);
    let mut cmd = cargo_bin_cmd!("trig");
    cmd.current_dir(dir.path())
        .args(["main.trig", "main.cat", "-c", "absent.toml"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}
