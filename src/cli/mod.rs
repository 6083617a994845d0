//! Command-line interface.

pub mod completions;
pub mod input;
pub mod output;
pub mod package;
pub mod store;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Manage plain-text and encrypted configuration, using a local JSON file as
/// storage.
#[derive(Parser)]
#[command(
    name = "configstore",
    about = "Manage plain-text and encrypted configuration, using a local JSON file as storage",
    version
)]
pub struct Cli {
    /// Print debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Do not assume the store's IAM role before calling the key-management service
    #[arg(long, global = true, env = "CONFIGSTORE_IGNORE_ROLE")]
    pub ignore_role: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Selects the store file.
#[derive(Args, Clone, Debug)]
pub struct DbArgs {
    /// The store JSON file
    #[arg(long, env = "CONFIGSTORE_DB", default_value = "./configstore.json")]
    pub db: PathBuf,
}

/// Selects the store file and its override layers.
#[derive(Args, Clone, Debug)]
pub struct ReadArgs {
    #[command(flatten)]
    pub db: DbArgs,

    /// JSON file overriding non-secret values; repeat to stack layers
    #[arg(long = "override", value_name = "FILE")]
    pub overrides: Vec<PathBuf>,
}

/// Options for creating a store.
#[derive(Args, Clone, Debug)]
pub struct CreateArgs {
    /// The AWS region of the master key
    #[arg(long, default_value = "eu-west-1")]
    pub region: String,

    /// The IAM role to assume before calling the key-management service
    #[arg(long, default_value = "")]
    pub role: String,

    /// The KMS key used as the master encryption key
    #[arg(long)]
    pub master_key: Option<String>,

    /// Use a plain-text data key instead of a KMS-backed one
    #[arg(long)]
    pub insecure: bool,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Initialise a new store
    Init {
        /// The directory to create the store file in
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        #[command(flatten)]
        create: CreateArgs,
    },

    /// Set a new value, or update an existing one
    Set {
        key: String,
        /// The value; read from stdin or prompted for when omitted
        value: Option<String>,
        /// Encrypt the value
        #[arg(long)]
        secret: bool,
        /// Mark the value as binary in listings
        #[arg(long)]
        binary: bool,
        #[command(flatten)]
        db: DbArgs,
    },

    /// Get a value
    Get {
        key: String,
        #[command(flatten)]
        read: ReadArgs,
    },

    /// List keys and their values
    Ls {
        /// Only list keys containing this text
        pattern: Option<String>,
        /// Show secrets as "(secret)" instead of decrypting them
        #[arg(long)]
        skip_decryption: bool,
        #[command(flatten)]
        read: ReadArgs,
    },

    /// Remove a value
    Unset {
        key: String,
        #[command(flatten)]
        db: DbArgs,
    },

    /// Encrypt an existing plain-text value
    Encrypt {
        key: String,
        #[command(flatten)]
        db: DbArgs,
    },

    /// Decrypt an existing secret value
    Decrypt {
        key: String,
        #[command(flatten)]
        db: DbArgs,
    },

    /// Encrypt a value directly with the store's KMS master key
    #[command(name = "as-kms-enc", alias = "as_kms_enc")]
    AsKmsEnc {
        key: String,
        #[command(flatten)]
        read: ReadArgs,
    },

    /// Fill in a template file with values from the store
    #[command(alias = "process_template")]
    ProcessTemplate {
        template: PathBuf,
        #[command(flatten)]
        read: ReadArgs,
    },

    /// Check that the store has every key a template needs
    #[command(alias = "test_template")]
    TestTemplate {
        template: PathBuf,
        #[command(flatten)]
        db: DbArgs,
    },

    /// Check that two store files contain the same keys
    #[command(alias = "compare_keys")]
    CompareKeys { db1: PathBuf, db2: PathBuf },

    /// Run a command after filling in values from the store
    Exec {
        #[command(flatten)]
        read: ReadArgs,
        /// Command template, e.g. `psql -h {{.db_host}}`
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Manage a package of environments
    Package {
        /// Base directory of the package
        #[arg(long, global = true, env = "CONFIGSTORE_BASEDIR", default_value = "./config")]
        basedir: PathBuf,

        #[command(subcommand)]
        action: PackageAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Package subcommands.
#[derive(Subcommand)]
pub enum PackageAction {
    /// Create the package directory layout
    Init,

    /// Create an environment or sub-environment
    Create {
        env: String,
        #[command(flatten)]
        create: CreateArgs,
    },

    /// Show all environments as a tree
    Envs,

    /// List environments, or the values of one
    Ls {
        env: Option<String>,
        #[arg(long)]
        skip_decryption: bool,
    },

    /// Get a value from an environment
    Get { env: String, key: String },

    /// Set a value in an environment (sub-environments take overrides only)
    Set {
        env: String,
        key: String,
        value: Option<String>,
        #[arg(long)]
        secret: bool,
        #[arg(long)]
        binary: bool,
    },

    /// Remove a value from an environment
    Unset { env: String, key: String },

    /// Encrypt a value in a main environment
    Encrypt { env: String, key: String },

    /// Decrypt a value in a main environment
    Decrypt { env: String, key: String },

    /// Copy values between two environments of the same depth
    Copy {
        src: String,
        dest: String,
        /// Only copy keys containing this text
        pattern: Option<String>,
        /// Also copy every sub-environment
        #[arg(long)]
        recursive: bool,
        /// Keep values that already exist at the destination
        #[arg(long)]
        skip_existing: bool,
    },

    /// Show values that differ between two environments
    Diff {
        env1: String,
        env2: String,
        #[arg(long)]
        skip_decryption: bool,
    },

    /// Show every key across all environments
    Tree {
        #[arg(long)]
        skip_decryption: bool,
    },

    /// Check keys match across environments and templates are complete
    Test,

    /// Render every template of the package for an environment
    ProcessTemplates { env: String, out_dir: PathBuf },
}

/// Execute a command.
pub fn execute(command: Command, ignore_role: bool) -> crate::error::Result<()> {
    use Command::*;

    match command {
        Init { dir, create } => store::init(&dir, &create),
        Set {
            key,
            value,
            secret,
            binary,
            db,
        } => store::set(&db, ignore_role, &key, value, secret, binary),
        Get { key, read } => store::get(&read, ignore_role, &key),
        Ls {
            pattern,
            skip_decryption,
            read,
        } => store::ls(&read, ignore_role, pattern.as_deref(), skip_decryption),
        Unset { key, db } => store::unset(&db, ignore_role, &key),
        Encrypt { key, db } => store::encrypt(&db, ignore_role, &key),
        Decrypt { key, db } => store::decrypt(&db, ignore_role, &key),
        AsKmsEnc { key, read } => store::as_kms_enc(&read, ignore_role, &key),
        ProcessTemplate { template, read } => store::process_template(&read, ignore_role, &template),
        TestTemplate { template, db } => store::test_template(&db, &template),
        CompareKeys { db1, db2 } => store::compare_keys(&db1, &db2, ignore_role),
        Exec { read, command } => store::exec(&read, ignore_role, &command),
        Package { basedir, action } => package::execute(&basedir, action, ignore_role),
        Completions { shell } => completions::execute(shell),
    }
}
