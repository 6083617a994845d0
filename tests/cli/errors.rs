//! Error reporting: messages, hints and exit codes.

use crate::support::*;
use predicates::prelude::*;

#[test]
fn test_missing_store_hints_init() {
    let t = Test::new();

    let output = t.get("KEY");
    assert_fails_with(&output, "failed to access");
    assert_stderr_contains(&output, "configstore init");
}

#[test]
fn test_missing_key() {
    let t = Test::init();
    assert_fails_with(&t.get("NOPE"), "key does not exist in store: NOPE");
}

#[test]
fn test_empty_key_rejected() {
    let t = Test::init();
    assert_fails_with(&t.set("", "value"), "key name cannot be empty");
}

#[test]
fn test_set_without_value_on_closed_stdin() {
    let t = Test::init();

    // A closed stdin reads as an empty value.
    let output = t.cmd().args(["set", "EMPTY"]).output().unwrap();
    assert_success(&output);
    assert_eq!(stdout(&t.get("EMPTY")), "\n");
}

#[test]
fn test_malformed_store_reports_position() {
    let t = Test::new();
    t.write("configstore.json", "{\n  \"version\": 3,\n  \"data\": {\n}");

    let output = t.get("KEY");
    assert_fails_with(&output, "failed to parse JSON from");
    assert_stderr_contains(&output, "at byte");
}

#[test]
fn test_missing_required_field() {
    let t = Test::new();
    t.write("configstore.json", r#"{"version": 3, "is_insecure": true, "data": {}}"#);

    assert_fails_with(&t.get("KEY"), "missing key in store");
}

#[test]
fn test_unknown_environment_hint() {
    let t = Test::package(&["prod"]);
    let output = t.package_cmd(&["get", "qa", "KEY"]);
    assert_fails_with(&output, "environment doesn't exist: qa");
    assert_stderr_contains(&output, "configstore package ls");
}

#[test]
fn test_unknown_sub_environment_names_level() {
    let t = Test::package(&["prod"]);
    let output = t.package_cmd(&["get", "prod/eu/dublin", "KEY"]);
    assert_fails_with(&output, "sub-environment doesn't exist: prod/eu");
}

#[test]
fn test_invalid_environment_reference() {
    let t = Test::package(&["prod"]);
    assert_fails_with(&t.package_cmd(&["get", "../prod", "KEY"]), "invalid environment");
}

#[test]
fn test_secure_store_without_kms_support() {
    let t = Test::new();
    t.write("configstore.json", &secure_store(&[("HOST", "h")], &[("PW", "x")]));

    // Plain values never need the provider.
    assert_eq!(stdout(&t.get("HOST")), "h\n");

    let output = t.get("PW");
    assert_failure(&output);
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_verbose_logs_to_stderr() {
    let t = Test::with_values(&[("HOST", "h")]);
    let output = t.cmd().args(["--verbose", "get", "HOST"]).output().unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "h\n");
    assert_stderr_contains(&output, "store opened");
}

#[test]
fn test_unknown_command_is_usage_error() {
    let t = Test::new();
    t.cmd()
        .arg("frobnicate")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_exec_without_command_is_usage_error() {
    let t = Test::init();
    t.cmd()
        .arg("exec")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_ignore_role_env_var_accepted() {
    let t = Test::with_values(&[("HOST", "h")]);
    t.cmd()
        .env("CONFIGSTORE_IGNORE_ROLE", "true")
        .args(["get", "HOST"])
        .assert()
        .success()
        .stdout("h\n");
}
