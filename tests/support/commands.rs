//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a configstore command running in the test directory.
    ///
    /// Environment fallbacks are cleared so the host cannot leak into tests.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("configstore").expect("failed to find configstore binary");
        cmd.env_remove("CONFIGSTORE_DB");
        cmd.env_remove("CONFIGSTORE_BASEDIR");
        cmd.env_remove("CONFIGSTORE_IGNORE_ROLE");
        cmd.env_remove("CONFIGSTORE_LOG");
        cmd.env("NO_COLOR", "1");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Shortcut for `configstore init --insecure`.
    pub fn init_cmd(&self) -> Output {
        self.cmd()
            .args(["init", "--insecure"])
            .output()
            .expect("failed to run configstore init")
    }

    /// Shortcut for `configstore set`.
    pub fn set(&self, key: &str, val: &str) -> Output {
        self.cmd()
            .args(["set", key, val])
            .output()
            .expect("failed to run configstore set")
    }

    /// Shortcut for `configstore set --secret`.
    pub fn set_secret(&self, key: &str, val: &str) -> Output {
        self.cmd()
            .args(["set", "--secret", key, val])
            .output()
            .expect("failed to run configstore set --secret")
    }

    /// Shortcut for `configstore get`.
    pub fn get(&self, key: &str) -> Output {
        self.cmd()
            .args(["get", key])
            .output()
            .expect("failed to run configstore get")
    }

    /// Shortcut for `configstore ls`.
    pub fn ls(&self) -> Output {
        self.cmd()
            .arg("ls")
            .output()
            .expect("failed to run configstore ls")
    }

    /// Run `configstore package --basedir config <args>`.
    pub fn package_cmd(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(["package", "--basedir", "config"])
            .args(args)
            .output()
            .expect("failed to run configstore package")
    }
}
