//! Tests for the single-store commands: `init`, `set`, `get`, `ls`,
//! `unset`, `encrypt`, `decrypt`, `compare-keys` and `exec`.

use crate::support::*;

// Basic value operations

#[test]
fn test_init_creates_insecure_store() {
    let t = Test::new();

    let output = t.init_cmd();
    assert_success(&output);
    assert_stdout_contains(&output, "created");
    assert_stderr_contains(&output, "insecure");

    let raw = t.read("configstore.json");
    assert!(raw.contains("\"is_insecure\": true"));
    assert!(raw.contains("\"version\": 3"));
}

#[test]
fn test_init_twice_fails() {
    let t = Test::init();
    assert_fails_with(&t.init_cmd(), "store already exists");
}

#[test]
fn test_init_into_directory() {
    let t = Test::new();
    std::fs::create_dir(t.path("stores")).unwrap();

    let output = t
        .cmd()
        .args(["init", "--insecure", "--dir", "stores"])
        .output()
        .unwrap();
    assert_success(&output);
    assert!(t.path("stores/configstore.json").is_file());
}

#[test]
fn test_secure_init_requires_master_key() {
    let t = Test::new();
    let output = t.cmd().arg("init").output().unwrap();
    assert_fails_with(&output, "master key id is required");
    assert_stderr_contains(&output, "--master-key");
    assert!(!t.db().exists());
}

#[test]
fn test_set_and_get_roundtrip() {
    let t = Test::init();

    assert_success(&t.set("DATABASE_URL", "postgres://localhost/db"));

    let output = t.get("DATABASE_URL");
    assert_success(&output);
    assert_eq!(stdout(&output), "postgres://localhost/db\n");
}

#[test]
fn test_set_overwrites() {
    let t = Test::with_values(&[("HOST", "old")]);
    assert_success(&t.set("HOST", "new"));
    assert_eq!(stdout(&t.get("HOST")), "new\n");
}

#[test]
fn test_secret_not_stored_in_plain_text() {
    let t = Test::init();
    assert_success(&t.set_secret("PASSWORD", "hunter2"));

    let raw = t.read("configstore.json");
    assert!(!raw.contains("hunter2"));
    assert!(raw.contains("\"is_secret\": true"));

    assert_eq!(stdout(&t.get("PASSWORD")), "hunter2\n");
}

#[test]
fn test_set_reads_piped_stdin() {
    let t = Test::init();

    let output = t
        .cmd()
        .args(["set", "--secret", "TOKEN"])
        .write_stdin("from-stdin")
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&t.get("TOKEN")), "from-stdin\n");
}

#[test]
fn test_binary_secret_written_raw() {
    let t = Test::init();
    let bytes = [0u8, 1, 2, 0xff, 0xfe];

    let output = t
        .cmd()
        .args(["set", "--secret", "--binary", "BLOB"])
        .write_stdin(bytes.to_vec())
        .output()
        .unwrap();
    assert_success(&output);

    let output = t.get("BLOB");
    assert_success(&output);
    assert_eq!(output.stdout, bytes);

    assert_stdout_contains(&t.ls(), "BLOB: (binary)");
}

#[test]
fn test_ls_lists_sorted_values() {
    let t = Test::with_values(&[("b_key", "2"), ("a_key", "1")]);
    assert_success(&t.set_secret("c_key", "3"));

    let output = t.ls();
    assert_success(&output);
    assert_eq!(stdout_lines(&output), vec!["a_key: 1", "b_key: 2", "c_key: 3"]);
}

#[test]
fn test_ls_pattern_and_skip_decryption() {
    let t = Test::with_values(&[("db_host", "localhost"), ("api_url", "x")]);
    assert_success(&t.set_secret("db_password", "hunter2"));

    let output = t
        .cmd()
        .args(["ls", "db", "--skip-decryption"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(
        stdout_lines(&output),
        vec!["db_host: localhost", "db_password: (secret)"]
    );
}

#[test]
fn test_unset_removes_key() {
    let t = Test::with_values(&[("KEY", "value")]);

    let output = t.cmd().args(["unset", "KEY"]).output().unwrap();
    assert_success(&output);

    assert_fails_with(&t.get("KEY"), "key does not exist in store: KEY");
}

#[test]
fn test_encrypt_then_decrypt() {
    let t = Test::with_values(&[("TOKEN", "abc")]);

    assert_success(&t.cmd().args(["encrypt", "TOKEN"]).output().unwrap());
    assert!(!t.read("configstore.json").contains("\"abc\""));
    assert_eq!(stdout(&t.get("TOKEN")), "abc\n");

    // Encrypting twice is a no-op.
    assert_success(&t.cmd().args(["encrypt", "TOKEN"]).output().unwrap());

    assert_success(&t.cmd().args(["decrypt", "TOKEN"]).output().unwrap());
    assert!(t.read("configstore.json").contains("\"value\": \"abc\""));
}

#[test]
fn test_db_flag_and_env_var() {
    let t = Test::new();
    std::fs::create_dir(t.path("other")).unwrap();
    assert_success(
        &t.cmd()
            .args(["init", "--insecure", "--dir", "other"])
            .output()
            .unwrap(),
    );

    let output = t
        .cmd()
        .args(["set", "--db", "other/configstore.json", "HOST", "x"])
        .output()
        .unwrap();
    assert_success(&output);

    let output = t
        .cmd()
        .env("CONFIGSTORE_DB", "other/configstore.json")
        .args(["get", "HOST"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "x\n");
}

// Overrides

#[test]
fn test_get_with_override_layers() {
    let t = Test::with_values(&[("HOST", "base"), ("PORT", "5432")]);
    t.write("one.json", &overrides(&[("HOST", "one"), ("PORT", "6432")]));
    t.write("two.json", &overrides(&[("HOST", "two")]));

    let output = t
        .cmd()
        .args(["ls", "--override", "one.json", "--override", "two.json"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout_lines(&output), vec!["HOST: two", "PORT: 6432"]);

    // The store itself is untouched.
    assert_eq!(stdout(&t.get("HOST")), "base\n");
}

#[test]
fn test_override_of_secret_rejected() {
    let t = Test::init();
    assert_success(&t.set_secret("PASSWORD", "hunter2"));
    t.write("layer.json", &overrides(&[("PASSWORD", "plain")]));

    let output = t
        .cmd()
        .args(["get", "PASSWORD", "--override", "layer.json"])
        .output()
        .unwrap();
    assert_fails_with(&output, "trying to override key with secret value: PASSWORD");
}

// compare-keys

#[test]
fn test_compare_keys_match() {
    let t = Test::new();
    for dir in ["a", "b"] {
        std::fs::create_dir(t.path(dir)).unwrap();
        assert_success(
            &t.cmd()
                .args(["init", "--insecure", "--dir", dir])
                .output()
                .unwrap(),
        );
        assert_success(
            &t.cmd()
                .args(["set", "--db", &format!("{}/configstore.json", dir), "HOST", dir])
                .output()
                .unwrap(),
        );
    }

    let output = t
        .cmd()
        .args(["compare-keys", "a/configstore.json", "b/configstore.json"])
        .output()
        .unwrap();
    assert_success(&output);
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_compare_keys_reports_differences() {
    let t = Test::new();
    for (dir, key) in [("a", "ONLY_A"), ("b", "ONLY_B")] {
        std::fs::create_dir(t.path(dir)).unwrap();
        assert_success(
            &t.cmd()
                .args(["init", "--insecure", "--dir", dir])
                .output()
                .unwrap(),
        );
        assert_success(
            &t.cmd()
                .args(["set", "--db", &format!("{}/configstore.json", dir), key, "1"])
                .output()
                .unwrap(),
        );
    }

    let output = t
        .cmd()
        .args(["compare-keys", "a/configstore.json", "b/configstore.json"])
        .output()
        .unwrap();
    assert_fails_with(&output, "keys differ");
    assert_stdout_contains(&output, "Keys not in a/configstore.json:");
    assert_stdout_contains(&output, "\"ONLY_B\"");
    assert_stdout_contains(&output, "\"ONLY_A\"");
}

// exec

#[test]
fn test_exec_renders_arguments() {
    let t = Test::with_values(&[("GREETING", "hello"), ("NAME", "world")]);

    let output = t
        .cmd()
        .args(["exec", "--", "echo", "{{.GREETING}}", "{{ index . \"NAME\" }}"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "hello world\n");
}

#[test]
fn test_exec_propagates_failure() {
    let t = Test::init();
    let output = t.cmd().args(["exec", "--", "false"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_exec_missing_key_runs_nothing() {
    let t = Test::init();
    let output = t
        .cmd()
        .args(["exec", "--", "touch", "{{.FILE}}"])
        .output()
        .unwrap();
    assert_fails_with(&output, "template references missing key: FILE");
}

#[test]
fn test_completions_generated() {
    let t = Test::new();
    let output = t.cmd().args(["completions", "bash"]).output().unwrap();
    assert_success(&output);
    assert_stdout_contains(&output, "configstore");
}
