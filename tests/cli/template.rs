//! Tests for `process-template` and `test-template`.

use crate::support::*;

#[test]
fn test_process_template_prints_rendered() {
    let t = Test::with_values(&[("DB_HOST", "db.local")]);
    assert_success(&t.set_secret("DB_PORT", "5432"));
    t.write("app.conf.tmpl", DB_TEMPLATE);

    let output = t
        .cmd()
        .args(["process-template", "app.conf.tmpl"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "host=db.local\nport=5432\n");
}

#[test]
fn test_process_template_with_override() {
    let t = Test::with_values(&[("DB_HOST", "db.local"), ("DB_PORT", "5432")]);
    t.write("layer.json", &overrides(&[("DB_HOST", "db.eu")]));
    t.write("app.conf.tmpl", DB_TEMPLATE);

    let output = t
        .cmd()
        .args(["process-template", "app.conf.tmpl", "--override", "layer.json"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "host=db.eu\nport=5432\n");
}

#[test]
fn test_process_template_comments_and_trim() {
    let t = Test::with_values(&[("DB_HOST", "db.local")]);
    t.write("url.tmpl", COMMENTED_TEMPLATE);

    let output = t
        .cmd()
        .args(["process-template", "url.tmpl"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "\nurl =db.local:5432\n");
}

#[test]
fn test_process_template_missing_key_prints_nothing() {
    let t = Test::with_values(&[("DB_HOST", "db.local")]);
    t.write("app.conf.tmpl", DB_TEMPLATE);

    let output = t
        .cmd()
        .args(["process-template", "app.conf.tmpl"])
        .output()
        .unwrap();
    assert_fails_with(&output, "template references missing key: DB_PORT");
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_process_template_syntax_error() {
    let t = Test::with_values(&[("DB_HOST", "db.local")]);
    t.write("bad.tmpl", "host={{.DB_HOST}}\n{{range .}}x{{end}}\n");

    let output = t
        .cmd()
        .args(["process-template", "bad.tmpl"])
        .output()
        .unwrap();
    assert_fails_with(&output, "template syntax error at byte 18");
}

#[test]
fn test_test_template_valid() {
    let t = Test::with_values(&[("DB_HOST", "a")]);
    assert_success(&t.set_secret("DB_PORT", "b"));
    t.write("app.conf.tmpl", DB_TEMPLATE);

    let output = t
        .cmd()
        .args(["test-template", "app.conf.tmpl"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_stdout_contains(&output, "is valid");
}

#[test]
fn test_test_template_missing_key() {
    let t = Test::with_values(&[("DB_HOST", "a")]);
    t.write("app.conf.tmpl", DB_TEMPLATE);

    let output = t
        .cmd()
        .args(["test-template", "app.conf.tmpl"])
        .output()
        .unwrap();
    assert_fails_with(&output, "template references missing key: DB_PORT");
}

#[test]
fn test_underscore_aliases() {
    let t = Test::with_values(&[("DB_HOST", "a"), ("DB_PORT", "1")]);
    t.write("app.conf.tmpl", DB_TEMPLATE);

    let output = t
        .cmd()
        .args(["test_template", "app.conf.tmpl"])
        .output()
        .unwrap();
    assert_success(&output);

    let output = t
        .cmd()
        .args(["process_template", "app.conf.tmpl"])
        .output()
        .unwrap();
    assert_success(&output);
}
