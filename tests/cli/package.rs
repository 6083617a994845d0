//! Tests for `configstore package` commands.

use crate::support::*;

/// prod with two values and a secret, prod/eu overriding the host.
fn populated() -> Test {
    let t = Test::package(&["prod", "prod/eu", "staging"]);
    assert_success(&t.package_cmd(&["set", "prod", "db_host", "db.prod"]));
    assert_success(&t.package_cmd(&["set", "prod", "db_port", "5432"]));
    assert_success(&t.package_cmd(&["set", "prod", "db_password", "hunter2", "--secret"]));
    assert_success(&t.package_cmd(&["set", "prod/eu", "db_host", "db.eu"]));
    t
}

#[test]
fn test_init_creates_layout() {
    let t = Test::new();
    let output = t.package_cmd(&["init"]);
    assert_success(&output);

    assert!(t.path("config/env/.gitkeep").is_file());
    assert!(t.path("config/template/.gitkeep").is_file());
}

#[test]
fn test_create_and_list_environments() {
    let t = Test::package(&["prod", "prod/eu", "prod/eu/dublin", "dev"]);

    let output = t.package_cmd(&["ls"]);
    assert_success(&output);
    assert_eq!(stdout_lines(&output), vec!["=== Environments:", "dev", "prod"]);

    let output = t.package_cmd(&["envs"]);
    assert_success(&output);
    assert_eq!(
        stdout_lines(&output),
        vec!["/dev", "/prod", "  /eu", "    /dublin"]
    );
}

#[test]
fn test_create_sub_environment_without_parent_fails() {
    let t = Test::package(&[]);
    let output = t.package_cmd(&["create", "prod/eu", "--insecure"]);
    assert_fails_with(&output, "environment doesn't exist: prod");
}

#[test]
fn test_create_existing_fails() {
    let t = Test::package(&["prod"]);
    let output = t.package_cmd(&["create", "prod", "--insecure"]);
    assert_fails_with(&output, "environment already exists: prod");
}

#[test]
fn test_get_applies_overrides() {
    let t = populated();

    assert_eq!(stdout(&t.package_cmd(&["get", "prod", "db_host"])), "db.prod\n");
    assert_eq!(stdout(&t.package_cmd(&["get", "prod/eu", "db_host"])), "db.eu\n");
    assert_eq!(stdout(&t.package_cmd(&["get", "prod/eu", "db_port"])), "5432\n");
    assert_eq!(
        stdout(&t.package_cmd(&["get", "prod/eu", "db_password"])),
        "hunter2\n"
    );
}

#[test]
fn test_ls_main_and_sub_environment() {
    let t = populated();

    let output = t.package_cmd(&["ls", "prod", "--skip-decryption"]);
    assert_success(&output);
    assert_eq!(
        stdout_lines(&output),
        vec![
            "=== Sub-environments:",
            "eu",
            "=== Values:",
            "db_host: db.prod",
            "db_password: (secret)",
            "db_port: 5432",
        ]
    );

    let output = t.package_cmd(&["ls", "prod/eu"]);
    assert_success(&output);
    assert_eq!(
        stdout_lines(&output),
        vec!["=== Override Values:", "db_host: db.eu"]
    );
}

#[test]
fn test_set_secret_in_sub_environment_rejected() {
    let t = populated();
    let output = t.package_cmd(&["set", "prod/eu", "db_port", "1", "--secret"]);
    assert_fails_with(&output, "secret values cannot be stored in overrides");
}

#[test]
fn test_set_override_for_unknown_key_rejected() {
    let t = populated();
    let output = t.package_cmd(&["set", "prod/eu", "nope", "1"]);
    assert_fails_with(&output, "override key doesn't exist in store: nope");
    assert_stderr_contains(&output, "set the key in the main environment first");
}

#[test]
fn test_unset_override() {
    let t = populated();
    assert_success(&t.package_cmd(&["unset", "prod/eu", "db_host"]));
    assert_eq!(stdout(&t.package_cmd(&["get", "prod/eu", "db_host"])), "db.prod\n");
}

#[test]
fn test_encrypt_only_on_main_environment() {
    let t = populated();
    let output = t.package_cmd(&["encrypt", "prod/eu", "db_port"]);
    assert_fails_with(&output, "only supported for main environments");

    assert_success(&t.package_cmd(&["encrypt", "prod", "db_port"]));
    assert_eq!(stdout(&t.package_cmd(&["get", "prod", "db_port"])), "5432\n");
}

#[test]
fn test_copy_recursive() {
    let t = populated();

    let output = t.package_cmd(&["copy", "prod", "staging", "--recursive"]);
    assert_success(&output);
    assert_stdout_contains(&output, "copied 3 keys from prod to staging");
    assert_stdout_contains(&output, "copied 1 keys from prod/eu to staging/eu");

    assert_eq!(
        stdout(&t.package_cmd(&["get", "staging/eu", "db_host"])),
        "db.eu\n"
    );
    assert_eq!(
        stdout(&t.package_cmd(&["get", "staging", "db_password"])),
        "hunter2\n"
    );
}

#[test]
fn test_copy_depth_mismatch() {
    let t = populated();
    let output = t.package_cmd(&["copy", "prod/eu", "staging"]);
    assert_fails_with(&output, "same depth");
}

#[test]
fn test_diff_shows_changed_and_missing() {
    let t = populated();
    assert_success(&t.package_cmd(&["set", "staging", "db_host", "db.staging"]));
    assert_success(&t.package_cmd(&["set", "staging", "db_port", "5432"]));

    let output = t.package_cmd(&["diff", "prod", "staging", "--skip-decryption"]);
    assert_success(&output);
    assert_eq!(
        stdout_lines(&output),
        vec![
            "Key | prod | staging",
            "db_host | db.prod | db.staging",
            "db_password | (secret) | (missing)",
        ]
    );
}

#[test]
fn test_diff_identical_environments() {
    let t = Test::package(&["a", "b"]);
    let output = t.package_cmd(&["diff", "a", "b"]);
    assert_success(&output);
    assert_stdout_contains(&output, "match");
}

#[test]
fn test_tree() {
    let t = populated();

    let output = t.package_cmd(&["tree", "--skip-decryption"]);
    assert_success(&output);
    assert_eq!(
        stdout_lines(&output),
        vec![
            "db_host",
            "  /prod: db.prod",
            "    /eu: db.eu",
            "  /staging: (missing)",
            "db_password",
            "  /prod: (secret)",
            "  /staging: (missing)",
            "db_port",
            "  /prod: 5432",
            "  /staging: (missing)",
        ]
    );
}

#[test]
fn test_package_test_passes() {
    let t = Test::package(&["prod", "staging"]);
    for env in ["prod", "staging"] {
        assert_success(&t.package_cmd(&["set", env, "DB_HOST", "h"]));
        assert_success(&t.package_cmd(&["set", env, "DB_PORT", "1"]));
    }
    t.write("config/template/app.conf", DB_TEMPLATE);

    let output = t.package_cmd(&["test"]);
    assert_success(&output);
    assert_stdout_contains(&output, "comparing keys for \"prod\" and \"staging\"");
    assert_stdout_contains(&output, "testing template file:");
    assert_stdout_contains(&output, "all tests passed");
}

#[test]
fn test_package_test_reports_key_mismatch() {
    let t = Test::package(&["prod", "staging"]);
    assert_success(&t.package_cmd(&["set", "prod", "ONLY_PROD", "1"]));

    let output = t.package_cmd(&["test"]);
    assert_fails_with(&output, "keys differ between prod and staging");
    assert_stdout_contains(&output, "Keys not in staging:");
    assert_stdout_contains(&output, "\"ONLY_PROD\"");
}

#[test]
fn test_package_test_reports_template_missing_key() {
    let t = Test::package(&["prod"]);
    assert_success(&t.package_cmd(&["set", "prod", "DB_HOST", "h"]));
    t.write("config/template/app.conf", DB_TEMPLATE);

    let output = t.package_cmd(&["test"]);
    assert_fails_with(&output, "template references missing key: DB_PORT");
}

#[test]
fn test_package_test_without_environments() {
    let t = Test::package(&[]);
    assert_fails_with(&t.package_cmd(&["test"]), "no environments in package");
}

#[test]
fn test_process_templates_writes_outputs() {
    let t = Test::package(&["prod", "prod/eu"]);
    assert_success(&t.package_cmd(&["set", "prod", "DB_HOST", "db.prod"]));
    assert_success(&t.package_cmd(&["set", "prod", "DB_PORT", "5432", "--secret"]));
    assert_success(&t.package_cmd(&["set", "prod/eu", "DB_HOST", "db.eu"]));
    t.write("config/template/app.conf", DB_TEMPLATE);
    std::fs::create_dir(t.path("out")).unwrap();

    let output = t.package_cmd(&["process-templates", "prod/eu", "out"]);
    assert_success(&output);
    assert_eq!(t.read("out/app.conf"), "host=db.eu\nport=5432\n");
    assert!(!t.path("out/.gitkeep").exists());
}

#[test]
fn test_process_templates_missing_out_dir() {
    let t = Test::package(&["prod"]);
    let output = t.package_cmd(&["process-templates", "prod", "nowhere"]);
    assert_fails_with(&output, "directory doesn't exist");
}

#[test]
fn test_basedir_env_var() {
    let t = Test::package(&["prod"]);
    let output = t
        .cmd()
        .env("CONFIGSTORE_BASEDIR", "config")
        .args(["package", "ls"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_stdout_contains(&output, "prod");
}
