/// Acceptance tests for the scriptpro command line
///
/// These tests run the binary against a workspace holding a copy of the
/// fixture scripts in fixtures/scripts/
mod common;

use common::TestWorkspace;
use predicates::prelude::*;
use serde_json::{json, Value};

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_exec_inline_source() {
    let workspace = TestWorkspace::new();

    let output = workspace
        .scriptpro()
        .args(["exec", "--source", "fn helper(x) { x + 1 } let out = helper(122);"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({"out": 123}));
}

#[test]
fn test_exec_file_with_params() {
    let workspace = TestWorkspace::new();

    let output = workspace
        .scriptpro()
        .args(["exec", "--file", "scripts/hello.rhai", "-p", "name=world"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({"greeting": "Hello, world!"}));
}

#[test]
fn test_exec_json_params_and_imports() {
    let workspace = TestWorkspace::new();

    let output = workspace
        .scriptpro()
        .args(["exec", "--file", "scripts/tripled.rhai", "-p", "value=14"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({"tripled": 42}));
}

#[test]
fn test_exec_reads_request_fields_from_params() {
    let workspace = TestWorkspace::new();

    let output = workspace
        .scriptpro()
        .args([
            "exec",
            "-p",
            "file=scripts/hello.rhai",
            "-p",
            "cache=false",
            "-p",
            "name=params",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({"greeting": "Hello, params!"}));

    let output = workspace
        .scriptpro()
        .args(["exec", "--source", "let seen = cache;", "-p", "cache=false"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout_json(&output)["error"].is_string());
}

#[test]
fn test_exec_without_response_prints_nothing() {
    let workspace = TestWorkspace::new();

    workspace
        .scriptpro()
        .args(["exec", "--source", "let out = 1;", "--no-response"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_exec_requires_file_or_source() {
    let workspace = TestWorkspace::new();

    workspace
        .scriptpro()
        .arg("exec")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Either file or source is required"));
}

#[test]
fn test_exec_syntax_error_fails() {
    let workspace = TestWorkspace::new();

    workspace
        .scriptpro()
        .args(["exec", "--file", "scripts/broken.rhai"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Syntax error in scripts/broken.rhai"));
}

#[test]
fn test_exec_runtime_error_is_reported_as_response() {
    let workspace = TestWorkspace::new();

    let output = workspace
        .scriptpro()
        .args(["exec", "--file", "scripts/failing.rhai"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let response = stdout_json(&output);
    assert!(response["error"]
        .as_str()
        .unwrap()
        .contains("sensor unavailable"));
    assert!(response.get("before").is_none());
}

#[test]
fn test_exec_failing_relative_import() {
    let workspace = TestWorkspace::new();

    let output = workspace
        .scriptpro()
        .args([
            "exec",
            "--source",
            r#"import "./does_not_exist" as missing; let out = 123;"#,
        ])
        .output()
        .unwrap();

    let response = stdout_json(&output);
    assert!(response["error"].is_string());
    assert!(response.get("out").is_none());
}

#[test]
fn test_process_convention() {
    let workspace = TestWorkspace::new();

    let output = workspace
        .scriptpro()
        .args([
            "exec",
            "--file",
            "scripts/report.rhai",
            "--response-convention",
            "process",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        json!({"stdout": "processed 3 items", "stderr": "", "returncode": 0})
    );

    let output = workspace
        .scriptpro()
        .args(["exec", "--file", "scripts/failing.rhai"])
        .env("SCRIPTPRO_CONFIG_RESPONSE_CONVENTION", "process")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(13));
    let response = stdout_json(&output);
    assert_eq!(response["stdout"], "");
    assert!(response["stderr"]
        .as_str()
        .unwrap()
        .starts_with("Error executing script:"));

    let output = workspace
        .scriptpro()
        .args(["exec", "--source", "let quiet = true;", "--response-convention", "process"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({}));
}

#[test]
fn test_list_discovered_capabilities() {
    let workspace = TestWorkspace::new();

    workspace
        .scriptpro()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("lights__kitchen"))
        .stdout(predicate::str::contains("Kitchen lights"))
        .stdout(predicate::str::contains("hello"))
        .stdout(predicate::str::contains("lib__helpers").not())
        .stdout(predicate::str::contains("broken").not())
        .stderr(predicate::str::contains("Failed to register script"));
}

#[test]
fn test_list_warns_about_unquoted_default_key() {
    let workspace = TestWorkspace::new();
    workspace.create_file(
        "scripts/garage.rhai",
        "const PARAMETERS = #{ door: #{ default: \"closed\" } };\nlet state = door;\n",
    );

    workspace
        .scriptpro()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("garage").not())
        .stdout(predicate::str::contains("lights__kitchen"))
        .stderr(predicate::str::contains("Failed to register script"))
        .stderr(predicate::str::contains("garage.rhai"))
        .stderr(predicate::str::contains("'default' is a reserved keyword"));
}

#[test]
fn test_list_json() {
    let workspace = TestWorkspace::new();

    let output = workspace.scriptpro().args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());

    let services = stdout_json(&output);
    let ids: Vec<&str> = services
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["identifier"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec!["exec", "failing", "hello", "lights__kitchen", "reload", "report", "tripled"]
    );

    let hello = &services[2];
    assert_eq!(hello["name"], "Say hello");
    assert_eq!(hello["fields"]["name"]["required"], true);
    assert_eq!(hello["fields"]["cache"]["default"], true);
}

#[test]
fn test_call_capability() {
    let workspace = TestWorkspace::new();

    let output = workspace
        .scriptpro()
        .args(["call", "lights__kitchen", "-p", "percent=40"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({"level": 102, "on": true}));
}

#[test]
fn test_call_unknown_capability() {
    let workspace = TestWorkspace::new();

    workspace
        .scriptpro()
        .args(["call", "garage__door"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown capability: garage__door"));
}

#[test]
fn test_scripts_dir_override() {
    let workspace = TestWorkspace::new();
    workspace.create_file("other/only.rhai", "let out = 1;");

    let output = workspace
        .scriptpro()
        .args(["list", "--json", "--scripts-dir", "other"])
        .output()
        .unwrap();

    let services = stdout_json(&output);
    let ids: Vec<&str> = services
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["identifier"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["exec", "only", "reload"]);
}

#[test]
fn test_check_prints_metadata() {
    let workspace = TestWorkspace::new();

    workspace
        .scriptpro()
        .args(["check", "scripts/lights/kitchen.rhai"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Capability:  lights__kitchen"))
        .stdout(predicate::str::contains("Name:        Kitchen lights"))
        .stdout(predicate::str::contains("percent (integer, default 100)"))
        .stdout(predicate::str::contains("cache (boolean, default true)"));
}

#[test]
fn test_check_does_not_execute() {
    let workspace = TestWorkspace::new();

    workspace
        .scriptpro()
        .args(["check", "scripts/failing.rhai"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Always fails at runtime"));
}

#[test]
fn test_check_reports_syntax_error() {
    let workspace = TestWorkspace::new();

    workspace
        .scriptpro()
        .args(["check", "scripts/broken.rhai"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Syntax error"));
}

#[test]
fn test_config_validate() {
    let workspace = TestWorkspace::new();

    workspace
        .scriptpro()
        .args(["config", "validate", "scriptpro.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file is valid"));

    workspace.create_file("bad.toml", "[server]\nbind = \"nowhere\"\n");
    workspace
        .scriptpro()
        .args(["config", "validate", "bad.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("server.bind"));
}

#[test]
fn test_config_generate_is_valid() {
    let workspace = TestWorkspace::new();

    let output = workspace
        .scriptpro()
        .args(["config", "generate"])
        .output()
        .unwrap();
    assert!(output.status.success());

    workspace.create_file("generated.toml", &String::from_utf8(output.stdout).unwrap());
    workspace
        .scriptpro()
        .args(["config", "validate", "generated.toml"])
        .assert()
        .success();
}

#[test]
fn test_config_show_merges_sources() {
    let workspace = TestWorkspace::new();

    workspace
        .scriptpro()
        .args(["config", "show", "--response-convention", "process"])
        .assert()
        .success()
        .stdout(predicate::str::contains("scriptpro.toml"))
        .stdout(predicate::str::contains("convention = \"process\""))
        .stdout(predicate::str::contains("lib/*"));
}
