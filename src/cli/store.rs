//! Single-store commands.
//!
//! Each command opens the store named by `--db`, applies any `--override`
//! layers, and performs one operation.

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::cli::{input, output, CreateArgs, DbArgs, ReadArgs};
use crate::core::client::{Client, InitOptions, Value};
use crate::core::diff::compare_keys as compare;
use crate::error::{ConflictError, Error, Result, ValidationError};

impl CreateArgs {
    /// Options for creating a store from these arguments.
    pub fn options(&self) -> InitOptions {
        InitOptions {
            region: self.region.clone(),
            role: self.role.clone(),
            master_key_id: self.master_key.clone().unwrap_or_default(),
            insecure: self.insecure,
        }
    }
}

fn open(db: &DbArgs, ignore_role: bool) -> Result<Client> {
    Client::open(&db.db, &[], ignore_role)
}

fn open_read(read: &ReadArgs, ignore_role: bool) -> Result<Client> {
    Client::open(&read.db.db, &read.overrides, ignore_role)
}

fn read_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::file(path, e))
}

/// Print `key: value` for listing, marking secrets.
pub(crate) fn print_value(key: &str, value: &Value) {
    let shown = value.display();
    if value.is_secret() {
        output::kv(key, output::secret(&shown));
    } else {
        output::kv(key, shown);
    }
}

/// Print a single value: binary values raw, text with a newline.
pub(crate) fn print_single(client: &Client, key: &str) -> Result<()> {
    let binary = client
        .document()
        .data
        .get(key)
        .map(|e| e.is_binary)
        .unwrap_or(false);

    if binary {
        let bytes = client.get_bytes(key)?;
        let mut stdout = std::io::stdout();
        stdout.write_all(&bytes)?;
        stdout.flush()?;
    } else {
        println!("{}", client.get(key)?.as_str());
    }
    Ok(())
}

/// Initialise a new store.
pub fn init(dir: &Path, create: &CreateArgs) -> Result<()> {
    info!(dir = %dir.display(), insecure = create.insecure, "initialising store");
    let client = Client::init(dir, &create.options())?;
    output::success(&format!("created {}", output::path(client.path().display())));
    if create.insecure {
        output::warn("this store is insecure: its data key is stored in plain text");
    }
    Ok(())
}

/// Set a value.
pub fn set(
    db: &DbArgs,
    ignore_role: bool,
    key: &str,
    value: Option<String>,
    secret: bool,
    binary: bool,
) -> Result<()> {
    let mut client = open(db, ignore_role)?;
    let raw = input::read_value(key, value, secret)?;
    client.set(key, &raw, secret, binary)
}

/// Print a value.
pub fn get(read: &ReadArgs, ignore_role: bool, key: &str) -> Result<()> {
    let client = open_read(read, ignore_role)?;
    print_single(&client, key)
}

/// List values, optionally filtered by a key substring.
pub fn ls(read: &ReadArgs, ignore_role: bool, pattern: Option<&str>, skip_decryption: bool) -> Result<()> {
    let client = open_read(read, ignore_role)?;
    for (key, value) in client.get_all(skip_decryption)? {
        if pattern.map_or(true, |p| key.contains(p)) {
            print_value(&key, &value);
        }
    }
    Ok(())
}

/// Remove a value.
pub fn unset(db: &DbArgs, ignore_role: bool, key: &str) -> Result<()> {
    open(db, ignore_role)?.unset(key)
}

/// Encrypt a plain-text value in place.
pub fn encrypt(db: &DbArgs, ignore_role: bool, key: &str) -> Result<()> {
    open(db, ignore_role)?.encrypt(key)
}

/// Decrypt a secret value in place.
pub fn decrypt(db: &DbArgs, ignore_role: bool, key: &str) -> Result<()> {
    open(db, ignore_role)?.decrypt(key)
}

/// Print a value encrypted directly with the master key.
pub fn as_kms_enc(read: &ReadArgs, ignore_role: bool, key: &str) -> Result<()> {
    let client = open_read(read, ignore_role)?;
    println!("{}", client.get_as_externally_wrapped(key)?);
    Ok(())
}

/// Print a rendered template.
pub fn process_template(read: &ReadArgs, ignore_role: bool, template: &Path) -> Result<()> {
    let client = open_read(read, ignore_role)?;
    let rendered = client.process_template(&read_template(template)?)?;
    print!("{}", rendered);
    std::io::stdout().flush()?;
    Ok(())
}

/// Check a template against the store's keys.
pub fn test_template(db: &DbArgs, template: &Path) -> Result<()> {
    // Never decrypts, so the role is irrelevant.
    let client = open(db, true)?;
    client.test_template(&read_template(template)?)?;
    output::success(&format!("{} is valid", output::path(template.display())));
    Ok(())
}

/// Report keys that only one of two stores has.
pub fn compare_keys(db1: &Path, db2: &Path, ignore_role: bool) -> Result<()> {
    let left = Client::open(db1, &[], ignore_role)?;
    let right = Client::open(db2, &[], ignore_role)?;
    report_key_comparison(&db1.display().to_string(), &left, &db2.display().to_string(), &right)
}

/// Print keys missing from either side; an error if any are.
pub(crate) fn report_key_comparison(
    left_name: &str,
    left: &Client,
    right_name: &str,
    right: &Client,
) -> Result<()> {
    let cmp = compare(&left.keys(), &right.keys());
    if cmp.matches() {
        return Ok(());
    }

    if !cmp.only_right.is_empty() {
        output::header(&format!("Keys not in {}:", left_name));
        for key in &cmp.only_right {
            println!("\"{}\"", key);
        }
    }
    if !cmp.only_left.is_empty() {
        output::header(&format!("Keys not in {}:", right_name));
        for key in &cmp.only_left {
            println!("\"{}\"", key);
        }
    }

    Err(ConflictError::KeysDiffer {
        left: left_name.to_string(),
        right: right_name.to_string(),
    }
    .into())
}

/// Render the command line as a template, then run it.
///
/// Exits with the command's status code.
pub fn exec(read: &ReadArgs, ignore_role: bool, command: &[String]) -> Result<()> {
    let client = open_read(read, ignore_role)?;
    let rendered = client.process_template(&command.join(" "))?;

    let mut parts = rendered.split_whitespace();
    let program = parts.next().ok_or(ValidationError::EmptyCommand)?;
    info!(program, "running command");

    let status = std::process::Command::new(program).args(parts).status()?;
    std::process::exit(status.code().unwrap_or(1));
}
