//! Package commands.
//!
//! Operate on a directory tree of environments under `--basedir`.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use crate::cli::store::{print_single, print_value, report_key_comparison};
use crate::cli::{input, output, PackageAction};
use crate::core::client::Client;
use crate::core::constants::MISSING;
use crate::core::diff::Diff;
use crate::core::env::{self, CopyOptions, EnvPath, Package, Tree};
use crate::core::types::Key;
use crate::core::validation::validate_text;
use crate::error::{Error, NotFoundError, Result, ValidationError};

/// Execute a package subcommand.
pub fn execute(basedir: &Path, action: PackageAction, ignore_role: bool) -> Result<()> {
    let package = Package::new(basedir);

    match action {
        PackageAction::Init => {
            Package::init(basedir)?;
            output::success(&format!("initialized package in {}", output::path(basedir.display())));
            Ok(())
        }
        PackageAction::Create { env, create } => {
            let env = EnvPath::parse(&env)?;
            package.create(&env, &create.options())?;
            output::success(&format!("created environment {}", output::env(&env.to_string())));
            Ok(())
        }
        PackageAction::Envs => print_envs(&package.env_root(), 0),
        PackageAction::Ls {
            env,
            skip_decryption,
        } => ls(&package, env.as_deref(), ignore_role, skip_decryption),
        PackageAction::Get { env, key } => {
            let client = package.open(&EnvPath::parse(&env)?, ignore_role)?;
            print_single(&client, &key)
        }
        PackageAction::Set {
            env,
            key,
            value,
            secret,
            binary,
        } => set(&package, &env, &key, value, secret, binary, ignore_role),
        PackageAction::Unset { env, key } => {
            let env = EnvPath::parse(&env)?;
            if env.is_main() {
                package.open(&env, ignore_role)?.unset(&key)
            } else {
                package.unset_override(&env, &key)
            }
        }
        PackageAction::Encrypt { env, key } => main_client(&package, &env, ignore_role)?.encrypt(&key),
        PackageAction::Decrypt { env, key } => main_client(&package, &env, ignore_role)?.decrypt(&key),
        PackageAction::Copy {
            src,
            dest,
            pattern,
            recursive,
            skip_existing,
        } => {
            let options = CopyOptions {
                pattern,
                skip_existing,
                recursive,
                ignore_role,
            };
            let src = EnvPath::parse(&src)?;
            let dest = EnvPath::parse(&dest)?;
            for level in env::copy(&package, &src, &dest, &options)? {
                output::dimmed(&format!(
                    "copied {} keys from {} to {}",
                    level.keys.len(),
                    level.src,
                    level.dest
                ));
            }
            output::success("done");
            Ok(())
        }
        PackageAction::Diff {
            env1,
            env2,
            skip_decryption,
        } => diff(&package, &env1, &env2, ignore_role, skip_decryption),
        PackageAction::Tree { skip_decryption } => {
            let tree = env::build_tree(&package, ignore_role, skip_decryption)?;
            print_tree(&tree, 0, true);
            Ok(())
        }
        PackageAction::Test => test(&package),
        PackageAction::ProcessTemplates { env, out_dir } => {
            process_templates(&package, &env, &out_dir, ignore_role)
        }
    }
}

fn main_client(package: &Package, env: &str, ignore_role: bool) -> Result<Client> {
    let env = EnvPath::parse(env)?;
    if !env.is_main() {
        return Err(ValidationError::InvalidEnvironment {
            env: env.to_string(),
            reason: "only supported for main environments".to_string(),
        }
        .into());
    }
    package.open(&env, ignore_role)
}

fn print_envs(dir: &Path, depth: usize) -> Result<()> {
    for name in env::list_dirs(dir)? {
        let shown = match depth {
            0 => output::env(&name),
            1 => output::key(&name),
            _ => name.clone(),
        };
        println!("{}/{}", "  ".repeat(depth), shown);
        print_envs(&dir.join(&name), depth + 1)?;
    }
    Ok(())
}

fn print_subenvs(names: &[String]) {
    if names.is_empty() {
        return;
    }
    output::header("=== Sub-environments:");
    for name in names {
        println!("{}", name);
    }
    println!();
}

fn ls(package: &Package, env: Option<&str>, ignore_role: bool, skip_decryption: bool) -> Result<()> {
    let Some(env) = env else {
        let envs = package.environments()?;
        if envs.is_empty() {
            output::dimmed("No environments in package");
            return Ok(());
        }
        output::header("=== Environments:");
        for name in envs {
            println!("{}", name);
        }
        return Ok(());
    };

    let env = EnvPath::parse(env)?;
    print_subenvs(&package.sub_environments(&env)?);

    if env.is_main() {
        let client = package.open(&env, ignore_role)?;
        output::header("=== Values:");
        for (key, value) in client.get_all(skip_decryption)? {
            print_value(&key, &value);
        }
    } else {
        output::header("=== Override Values:");
        for (key, value) in package.load_override(&env)? {
            output::kv(&key, value);
        }
    }
    Ok(())
}

fn set(
    package: &Package,
    env: &str,
    key: &str,
    value: Option<String>,
    secret: bool,
    binary: bool,
    ignore_role: bool,
) -> Result<()> {
    let env = EnvPath::parse(env)?;
    if env.is_main() {
        let mut client = package.open(&env, ignore_role)?;
        let raw = input::read_value(key, value, secret)?;
        return client.set(key, &raw, secret, binary);
    }

    if secret {
        return Err(ValidationError::SecretOverride(key.to_string()).into());
    }
    let raw = input::read_value(key, value, false)?;
    let text = validate_text(key, &raw)?;
    package.set_override(&env, key, text)
}

fn view(
    package: &Package,
    env: &EnvPath,
    ignore_role: bool,
    skip_decryption: bool,
) -> Result<BTreeMap<Key, String>> {
    let client = package.open(env, ignore_role)?;
    Ok(client
        .get_all(skip_decryption)?
        .into_iter()
        .map(|(key, value)| {
            let shown = value.display();
            let shown = if value.is_secret() { output::secret(&shown) } else { shown };
            (key, shown)
        })
        .collect())
}

fn diff(package: &Package, env1: &str, env2: &str, ignore_role: bool, skip_decryption: bool) -> Result<()> {
    let left = EnvPath::parse(env1)?;
    let right = EnvPath::parse(env2)?;
    let diff = Diff::compute(
        &view(package, &left, ignore_role, skip_decryption)?,
        &view(package, &right, ignore_role, skip_decryption)?,
    );

    if diff.is_same() {
        output::success("the two environments match");
        return Ok(());
    }

    let missing = output::missing(MISSING);
    output::header(&format!("Key | {} | {}", left, right));
    for entry in diff.changes() {
        println!(
            "{} | {} | {}",
            output::key(entry.key()),
            entry.left().unwrap_or(missing.as_str()),
            entry.right().unwrap_or(missing.as_str())
        );
    }
    Ok(())
}

fn print_tree(tree: &Tree, indent: usize, is_root: bool) {
    for (name, node) in tree {
        let label = if is_root {
            output::env(name)
        } else {
            output::key(&format!("/{}", name))
        };
        let value = match (&node.value, node.is_secret) {
            (Some(v), true) => format!(": {}", output::secret(v)),
            (Some(v), false) => format!(": {}", v),
            // Only main environments report missing keys.
            (None, _) if indent == 2 => format!(": {}", output::missing(MISSING)),
            (None, _) => String::new(),
        };
        println!("{}{}{}", " ".repeat(indent), label, value);
        print_tree(&node.children, indent + 2, false);
    }
}

/// Compare keys of every main environment against the first, then check
/// every template against the first environment.
fn test(package: &Package) -> Result<()> {
    let envs = package.environments()?;
    let Some((first, rest)) = envs.split_first() else {
        return Err(NotFoundError::NoEnvironments(package.env_root()).into());
    };

    // Only key names and template references are checked; nothing is
    // decrypted, so the role is never assumed.
    let first_client = package.open(&EnvPath::parse(first)?, true)?;
    for name in rest {
        let other = package.open(&EnvPath::parse(name)?, true)?;
        output::dimmed(&format!("comparing keys for \"{}\" and \"{}\"", first, name));
        report_key_comparison(first, &first_client, name, &other)?;
    }

    for path in package.templates()? {
        output::dimmed(&format!("testing template file: {}", path.display()));
        let source = std::fs::read_to_string(&path).map_err(|e| Error::file(&path, e))?;
        first_client.test_template(&source)?;
    }

    output::success("all tests passed");
    Ok(())
}

fn process_templates(package: &Package, env: &str, out_dir: &Path, ignore_role: bool) -> Result<()> {
    let env = EnvPath::parse(env)?;
    let client = package.open(&env, ignore_role)?;
    if !out_dir.is_dir() {
        return Err(NotFoundError::Directory(out_dir.to_path_buf()).into());
    }

    for path in package.templates()? {
        let Some(name) = path.file_name() else {
            continue;
        };
        info!(template = %path.display(), "processing template");
        let source = std::fs::read_to_string(&path).map_err(|e| Error::file(&path, e))?;
        let rendered = client.process_template(&source)?;
        let target = out_dir.join(name);
        std::fs::write(&target, rendered).map_err(|e| Error::file(&target, e))?;
        output::dimmed(&format!("wrote {}", target.display()));
    }

    output::success("done");
    Ok(())
}
